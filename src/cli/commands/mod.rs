pub mod csv_template;
pub mod migrate;
pub mod ping;
pub mod postman;
