use item_handlers::{runtime, Operation};
use lambda_runtime::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    runtime::run(Operation::Update).await
}
