pub mod anime_service;
pub mod indexer_movies;
pub mod indexer_tv;
pub mod media_server;
pub mod request_manager;
pub mod retry;
pub mod torrent;
