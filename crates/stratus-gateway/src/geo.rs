//! Static provider/region geography asset.
//!
//! A fixed join table from `(provider, native region)` to coordinates and a
//! display address. Lookups are case-insensitive. An unknown provider or
//! region is a terminal error for the connection being resolved, never for
//! its siblings.

use crate::error::{GatewayError, GatewayResult};
use crate::types::GeoLocation;

struct RegionRecord {
    provider: &'static str,
    region: &'static str,
    latitude: f64,
    longitude: f64,
    display: &'static str,
}

const fn rec(
    provider: &'static str,
    region: &'static str,
    latitude: f64,
    longitude: f64,
    display: &'static str,
) -> RegionRecord {
    RegionRecord { provider, region, latitude, longitude, display }
}

static REGIONS: &[RegionRecord] = &[
    rec("aws", "us-east-1", 38.9072, -77.0369, "N. Virginia, USA"),
    rec("aws", "us-west-2", 45.5235, -122.6762, "Oregon, USA"),
    rec("aws", "eu-west-1", 53.3498, -6.2603, "Dublin, Ireland"),
    rec("aws", "eu-central-1", 50.1109, 8.6821, "Frankfurt, Germany"),
    rec("aws", "ap-northeast-1", 35.6762, 139.6503, "Tokyo, Japan"),
    rec("aws", "ap-northeast-2", 37.5665, 126.978, "Seoul, South Korea"),
    rec("aws", "ap-southeast-1", 1.3521, 103.8198, "Singapore"),
    rec("azure", "eastus", 37.3719, -79.8164, "Virginia, USA"),
    rec("azure", "westeurope", 52.3667, 4.9, "Netherlands"),
    rec("azure", "koreacentral", 37.5665, 126.978, "Seoul, South Korea"),
    rec("azure", "japaneast", 35.6762, 139.6503, "Tokyo, Japan"),
    rec("gcp", "us-central1", 41.2619, -95.8608, "Iowa, USA"),
    rec("gcp", "europe-west1", 50.4491, 3.8184, "Belgium"),
    rec("gcp", "asia-northeast3", 37.5665, 126.978, "Seoul, South Korea"),
    rec("alibaba", "ap-northeast-1", 35.6762, 139.6503, "Tokyo, Japan"),
    rec("alibaba", "ap-northeast-2", 37.5665, 126.978, "Seoul, South Korea"),
    rec("tencent", "ap-seoul", 37.5665, 126.978, "Seoul, South Korea"),
    rec("tencent", "ap-jakarta", -6.2088, 106.8456, "Jakarta, Indonesia"),
    rec("ibm", "us-south", 32.7767, -96.797, "Dallas, USA"),
    rec("openstack", "regionone", 0.0, 0.0, "Private region"),
];

/// Resolve the geolocation for a provider's native region.
pub fn cloud_location(provider: &str, native_region: &str) -> GatewayResult<GeoLocation> {
    let provider = provider.to_lowercase();
    let native_region = native_region.to_lowercase();

    let record = REGIONS
        .iter()
        .find(|r| r.provider == provider && r.region == native_region)
        .ok_or_else(|| {
            GatewayError::UnknownLocation(format!("{provider}/{native_region}"))
        })?;

    Ok(GeoLocation {
        latitude: format!("{:.4}", record.latitude),
        longitude: format!("{:.4}", record.longitude),
        brief_addr: record.display.to_string(),
        cloud_type: provider,
        native_region,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_region() {
        let loc = cloud_location("aws", "ap-northeast-2").unwrap();
        assert_eq!(loc.brief_addr, "Seoul, South Korea");
        assert_eq!(loc.cloud_type, "aws");
        assert_eq!(loc.native_region, "ap-northeast-2");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let loc = cloud_location("AWS", "AP-NORTHEAST-2").unwrap();
        assert_eq!(loc.native_region, "ap-northeast-2");
    }

    #[test]
    fn unknown_provider_or_region_errors() {
        assert!(matches!(
            cloud_location("nimbus9", "nowhere-1"),
            Err(GatewayError::UnknownLocation(_))
        ));
        assert!(matches!(
            cloud_location("aws", "mars-east-1"),
            Err(GatewayError::UnknownLocation(_))
        ));
    }
}
