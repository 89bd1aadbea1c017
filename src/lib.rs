// Tsubame image route resolution library

pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod logging;
pub mod media;
pub mod negotiate;
pub mod route;
pub mod steps;

pub use config::{Options, RouterConfig};
pub use error::RouteError;
pub use route::{Resolver, RouteInfo};
pub use steps::{ParamValue, Step};
