use beat::view::app::App;

#[tokio::main]
async fn main() {
    let app = App::new();
    if let Err(err) = app.run().await {
        eprintln!("App closed with error: {:#?}", err);
    }
}
