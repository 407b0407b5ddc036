//! Shipping-label intake
//!
//! Turns a label request into a [`Package`]: serving offices are chosen by
//! sender and recipient state, missing GPS coordinates are jittered around
//! the serving office, identifiers are content hashes, and pickup/delivery
//! estimates come from the schedule calculator. The label payload itself
//! passes through the [`LabelCodec`] seam; 2D-barcode rendering lives
//! outside this crate and the in-tree codec is a byte passthrough.

use crate::network::NetworkModel;
use crate::schedule::{advance_to_after, estimate_local_start, local_delay_hours};
use crate::shipment::package::{content_id, random_gps_location, Address, Package, PackageContent};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors raised during label intake
#[derive(Debug, Error)]
pub enum LabelError {
    /// No office serves the sender's state
    #[error("no office serves sender state '{0}'")]
    UnknownSenderState(String),

    /// No office serves the recipient's state
    #[error("no office serves recipient state '{0}'")]
    UnknownRecipientState(String),

    /// The requested carrier is not part of the network
    #[error("carrier '{0}' is not part of the network")]
    UnknownCarrier(String),

    /// Label payload encoding failed
    #[error("label payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A shipping-label request, as received from the sender
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRequest {
    /// Carrier to accept the package; chosen by sender state when empty
    #[serde(default)]
    pub carrier: String,
    /// Handling code, `P` marks perishable
    pub handling_cd: String,
    /// Sender address
    pub sender: Address,
    /// Recipient address
    pub recipient: Address,
    /// Declared content
    pub content: PackageContent,
}

impl LabelRequest {
    /// Load a label request from a JSON file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::from)
    }
}

/// Response returned to the label requester
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelResponse {
    /// Tracking identifier of the created package
    pub uid: String,
    /// Carrier accepting the package
    pub carrier: String,
    /// Estimated local pickup time
    pub estimated_pickup: chrono::DateTime<Utc>,
    /// Estimated local delivery time
    pub estimated_delivery: chrono::DateTime<Utc>,
    /// Encoded label image bytes
    #[serde(with = "serde_label_hex")]
    pub label: Vec<u8>,
}

mod serde_label_hex {
    //! Label bytes serialize as a lowercase hex string.
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(deserializer)?;
        (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(hex.get(i..i + 2).unwrap_or_default(), 16)
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

/// Encoder/decoder seam for the printed label
pub trait LabelCodec {
    /// Encode the label payload into image bytes
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, LabelError>;
    /// Decode image bytes back into the label payload
    fn decode(&self, image: &[u8]) -> Result<Vec<u8>, LabelError>;
}

/// Byte-passthrough codec, the in-tree default
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCodec;

impl LabelCodec for PassthroughCodec {
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, LabelError> {
        Ok(payload.to_vec())
    }

    fn decode(&self, image: &[u8]) -> Result<Vec<u8>, LabelError> {
        Ok(image.to_vec())
    }
}

/// Create a [`Package`] from a label request
///
/// The sender's serving office fixes the accepting carrier when the request
/// leaves it blank. Addresses without GPS coordinates are placed at a random
/// position near their serving office. The delivery estimate is corrected to
/// never precede the pickup estimate.
pub fn create_package<R: Rng>(
    model: &NetworkModel,
    request: &LabelRequest,
    rng: &mut R,
) -> Result<Package, LabelError> {
    let origin = if request.carrier.is_empty() {
        model
            .office_by_state(&request.sender.state_province)
            .ok_or_else(|| LabelError::UnknownSenderState(request.sender.state_province.clone()))?
    } else {
        if model.carrier(&request.carrier).is_none() {
            return Err(LabelError::UnknownCarrier(request.carrier.clone()));
        }
        model
            .carrier_office_by_state(&request.carrier, &request.sender.state_province)
            .ok_or_else(|| LabelError::UnknownSenderState(request.sender.state_province.clone()))?
    };
    let destination = model
        .office_by_state(&request.recipient.state_province)
        .ok_or_else(|| {
            LabelError::UnknownRecipientState(request.recipient.state_province.clone())
        })?;

    let mut sender = request.sender.clone();
    let mut recipient = request.recipient.clone();
    place_address(&mut sender, origin.latitude, origin.longitude, rng);
    place_address(&mut recipient, destination.latitude, destination.longitude, rng);
    sender.uid = content_id(&sender)?;
    recipient.uid = content_id(&recipient)?;

    let pickup_delay = local_delay_hours(
        sender.latitude.unwrap_or(origin.latitude),
        sender.longitude.unwrap_or(origin.longitude),
        origin.latitude,
        origin.longitude,
    );
    let delivery_delay = local_delay_hours(
        recipient.latitude.unwrap_or(destination.latitude),
        recipient.longitude.unwrap_or(destination.longitude),
        destination.latitude,
        destination.longitude,
    );
    let estimated_pickup = estimate_local_start(&origin.gmt_offset, pickup_delay);
    let mut estimated_delivery = estimate_local_start(&destination.gmt_offset, delivery_delay);
    if estimated_delivery <= estimated_pickup {
        estimated_delivery = advance_to_after(estimated_delivery, estimated_pickup);
    }

    let mut package = Package {
        uid: String::new(),
        handling_cd: request.handling_cd.clone(),
        product: request.content.product.clone(),
        carrier: origin.carrier.clone(),
        created: Utc::now(),
        estimated_pickup,
        estimated_delivery,
        sender,
        recipient,
        content: request.content.clone(),
    };
    package.uid = content_id(&package)?;
    info!(
        package = %package.uid,
        carrier = %package.carrier,
        origin = %origin.iata,
        destination = %destination.iata,
        "shipping label created"
    );
    Ok(package)
}

fn place_address<R: Rng>(address: &mut Address, latitude: f64, longitude: f64, rng: &mut R) {
    if address.latitude.is_none() || address.longitude.is_none() {
        let (lat, lon) = random_gps_location(latitude, longitude, rng);
        address.latitude = Some(lat);
        address.longitude = Some(lon);
    }
}
