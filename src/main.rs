use std::sync::Arc;

use minesweeper_arena::{
    cors::create_cors,
    logic::{Lobby, SharedLobby},
    routes::{status, websocket_handler},
};
use rocket::{Build, Rocket, routes};
use tokio::sync::Mutex;
use tracing::info;

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    tracing_subscriber::fmt::init();
    info!("starting minesweeper arena server");

    let lobby: SharedLobby = Arc::new(Mutex::new(Lobby::new()));

    rocket::build()
        .attach(create_cors())
        .manage(lobby)
        .mount("/", routes![websocket_handler, status])
}
