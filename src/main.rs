#[tokio::main]
async fn main() {
    if let Err(err) = travel_companion_lib::run().await {
        eprintln!("travel-companion: {err}");
        std::process::exit(1);
    }
}
