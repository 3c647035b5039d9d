pub mod analytics;
pub mod browser;
pub mod crawler;
pub mod images;
pub mod models;
pub mod olx_scraper;
pub mod sheet;
