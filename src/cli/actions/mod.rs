pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        session_ttl_seconds: i64,
        secure_cookies: bool,
        google_client_id: Option<String>,
        google_client_secret: Option<String>,
        google_redirect_url: Option<String>,
    },
}
