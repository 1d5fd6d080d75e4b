//! Compatible HID scale table

use super::backend::HidDeviceInfo;

/// HID usage page for weighing devices
pub const WEIGHING_USAGE_PAGE: u16 = 0x8D;

/// Usage code of a scale device
pub const SCALE_USAGE: u16 = 0x20;

/// A vendor known to ship HID scales
#[derive(Debug, Clone, Copy)]
pub struct KnownVendor {
    pub name: &'static str,
    pub vendor_id: u16,
    pub product_ids: &'static [u16],
}

pub const KNOWN_VENDORS: &[KnownVendor] = &[
    KnownVendor {
        name: "DYMO",
        vendor_id: 0x0922,
        // M5, M10, M25, S series
        product_ids: &[0x8003, 0x8004, 0x8005, 0x8009],
    },
    KnownVendor {
        name: "Mettler Toledo",
        vendor_id: 0x0EB8,
        product_ids: &[0xF000, 0xF001, 0x2200],
    },
];

/// Brand name if `device` looks like a scale
pub fn match_device(device: &HidDeviceInfo) -> Option<String> {
    let known = KNOWN_VENDORS.iter().find(|v| {
        v.vendor_id == device.vendor_id && v.product_ids.contains(&device.product_id)
    });
    if let Some(vendor) = known {
        return Some(vendor.name.to_string());
    }

    if device.usage_page == WEIGHING_USAGE_PAGE || device.usage == SCALE_USAGE {
        let brand = device
            .product
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "Generic HID scale".to_string());
        return Some(brand);
    }

    None
}

/// First compatible device in enumeration order
pub fn find_compatible(devices: &[HidDeviceInfo]) -> Option<(&HidDeviceInfo, String)> {
    devices
        .iter()
        .find_map(|d| match_device(d).map(|brand| (d, brand)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> HidDeviceInfo {
        HidDeviceInfo {
            path: format!("{vendor_id:04x}:{product_id:04x}"),
            vendor_id,
            product_id,
            usage_page,
            usage,
            product: None,
        }
    }

    #[test]
    fn test_known_vendor_matches() {
        assert_eq!(match_device(&device(0x0922, 0x8003, 0, 0)).as_deref(), Some("DYMO"));
        assert_eq!(
            match_device(&device(0x0EB8, 0xF000, 0, 0)).as_deref(),
            Some("Mettler Toledo")
        );
    }

    #[test]
    fn test_unknown_product_of_known_vendor() {
        assert_eq!(match_device(&device(0x0922, 0x0001, 0x01, 0x06)), None);
    }

    #[test]
    fn test_usage_page_or_usage_matches() {
        assert!(match_device(&device(0x1234, 0x0001, WEIGHING_USAGE_PAGE, 0)).is_some());
        assert!(match_device(&device(0x1234, 0x0001, 0x01, SCALE_USAGE)).is_some());
        assert!(match_device(&device(0x046D, 0xC52B, 0x01, 0x02)).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut generic = device(0x1234, 0x0001, WEIGHING_USAGE_PAGE, SCALE_USAGE);
        generic.product = Some("Kitchen Scale".to_string());
        let devices = vec![
            device(0x046D, 0xC52B, 0x01, 0x02),
            generic,
            device(0x0922, 0x8003, 0, 0),
        ];

        let (found, brand) = find_compatible(&devices).unwrap();
        assert_eq!(found.vendor_id, 0x1234);
        assert_eq!(brand, "Kitchen Scale");
    }
}
