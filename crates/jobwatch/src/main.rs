use jobwatch::run;

#[tokio::main(flavor = "current_thread")]
async fn main() {
  if let Err(e) = run().await {
    eprintln!("Error: {}", e);
    std::process::exit(1);
  }
}
