//! Package creation and shipping-label intake

pub mod label;
pub mod package;

pub use label::{
    create_package, LabelCodec, LabelError, LabelRequest, LabelResponse, PassthroughCodec,
};
pub use package::{content_id, fnv1a64, random_gps_location, Address, Package, PackageContent};
