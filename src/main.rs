#[actix_web::main]
async fn main() -> std::io::Result<()> {
    product_reader_lib::run().await
}
