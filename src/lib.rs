pub mod configuration;
pub mod domain;
pub mod gazetteer;
pub mod services;
