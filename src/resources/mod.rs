use crate::output::{all, Output};
use crate::stack::{Registered, Resource, Stack};

mod s3_bucket;
pub use s3_bucket::*;
mod bucket_object;
pub use bucket_object::*;
mod cloudfront;
pub use cloudfront::*;
mod route53;
pub use route53::*;

// higher level resources:
mod static_website;
pub use static_website::*;
