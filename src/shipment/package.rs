//! Packages, addresses, and content hashing
//!
//! Package and address identifiers are FNV-1a-64 hashes of the entity's own
//! JSON encoding, taken before the identifier field is set. Identical input
//! therefore produces the same identifier, which gives the graph upsert
//! semantics for repeated label requests.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A sender or recipient address with GPS coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Content-derived identifier, empty until assigned
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Addressee name
    pub name: String,
    /// Street line
    #[serde(default)]
    pub street: String,
    /// City
    #[serde(default)]
    pub city: String,
    /// State or province, matched against office states
    pub state_province: String,
    /// Postal code
    #[serde(default)]
    pub postal_cd: String,
    /// Country
    #[serde(default)]
    pub country: String,
    /// Latitude, jittered around the serving office when absent
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude, jittered around the serving office when absent
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Declared content of a package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageContent {
    /// Product name, matched against thresholds for monitoring
    pub product: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Producer name
    #[serde(default)]
    pub producer: String,
    /// Item count
    #[serde(default)]
    pub count: u32,
    /// First lot number in the shipment
    #[serde(default)]
    pub start_lot_number: String,
    /// Last lot number in the shipment
    #[serde(default)]
    pub end_lot_number: String,
}

/// A package created from a shipping-label request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Content-derived identifier, empty until assigned
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Handling code, `P` marks perishable
    pub handling_cd: String,
    /// Product name
    pub product: String,
    /// Carrier accepting the package at the origin
    pub carrier: String,
    /// Label creation time
    pub created: DateTime<Utc>,
    /// Estimated local pickup time
    pub estimated_pickup: DateTime<Utc>,
    /// Estimated local delivery time
    pub estimated_delivery: DateTime<Utc>,
    /// Sender address
    pub sender: Address,
    /// Recipient address
    pub recipient: Address,
    /// Declared content
    pub content: PackageContent,
}

/// FNV-1a 64-bit hash
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Decimal FNV-1a-64 identifier of a serializable entity
pub fn content_id<T: Serialize>(entity: &T) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(entity)?;
    Ok(fnv1a64(&encoded).to_string())
}

/// Random GPS position within 0.2 degrees of a point, rounded to 4 decimals
pub fn random_gps_location<R: Rng>(latitude: f64, longitude: f64, rng: &mut R) -> (f64, f64) {
    let jitter = |center: f64, rng: &mut R| {
        let moved = center + rng.gen::<f64>() * 0.4 - 0.2;
        (moved * 10_000.0).round() / 10_000.0
    };
    (jitter(latitude, rng), jitter(longitude, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    fn sample_address() -> Address {
        Address {
            uid: String::new(),
            name: "Acme Labs".to_string(),
            street: "1 Main St".to_string(),
            city: "Denver".to_string(),
            state_province: "CO".to_string(),
            postal_cd: "80202".to_string(),
            country: "USA".to_string(),
            latitude: Some(39.75),
            longitude: Some(-104.99),
        }
    }

    #[test]
    fn test_fnv1a64_reference_vectors() {
        // Standard FNV-1a test vectors.
        assert_eq!(fnv1a64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a64(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn test_content_id_is_stable() {
        let address = sample_address();
        let first = content_id(&address).unwrap();
        let second = content_id(&address).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_content_id_ignores_assigned_uid() {
        let mut address = sample_address();
        let before = content_id(&address).unwrap();
        address.uid.clear();
        let after = content_id(&address).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_content_id_changes_with_content() {
        let mut address = sample_address();
        let before = content_id(&address).unwrap();
        address.city = "Boulder".to_string();
        assert_ne!(before, content_id(&address).unwrap());
    }

    #[test]
    fn test_random_gps_location_bounds_and_rounding() {
        let mut rng = thread_rng();
        for _ in 0..200 {
            let (lat, lon) = random_gps_location(39.7392, -104.9903, &mut rng);
            assert!((lat - 39.7392).abs() <= 0.2 + 1e-4);
            assert!((lon + 104.9903).abs() <= 0.2 + 1e-4);
            assert_eq!((lat * 10_000.0).round() / 10_000.0, lat);
            assert_eq!((lon * 10_000.0).round() / 10_000.0, lon);
        }
    }
}
