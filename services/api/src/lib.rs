mod cli;
mod infra;
mod review;
mod routes;
mod server;

use facility_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
