//! Skin catalog.
//!
//! Skins are chosen client-side; the server only stores the index and falls
//! back to the default skin when the index is out of range.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skin {
    pub name: &'static str,
    /// 0xRRGGBB
    pub color: u32,
    pub premium: bool,
}

const fn skin(name: &'static str, color: u32, premium: bool) -> Skin {
    Skin {
        name,
        color,
        premium,
    }
}

pub const DEFAULT_SKIN_ID: u32 = 0;

pub const SKINS: [Skin; 10] = [
    skin("Default", 0xff4d4d, false),
    skin("Ocean", 0x4d79ff, false),
    skin("Forest", 0x4dff4d, false),
    skin("Sunset", 0xff9e4d, false),
    skin("Grape", 0x9e4dff, false),
    skin("Gold", 0xffd700, true),
    skin("Diamond", 0xb9f2ff, true),
    skin("Galaxy", 0x6600cc, true),
    skin("Toxic", 0x39ff14, true),
    skin("Rainbow", 0xff0000, true),
];

pub fn get(id: u32) -> Option<&'static Skin> {
    SKINS.get(id as usize)
}

/// Map a client-supplied skin index onto the catalog. Missing, negative or
/// out-of-range values resolve to the default skin. Premium skins are not gated.
pub fn resolve_skin_id(requested: Option<i32>) -> u32 {
    match requested.and_then(|id| u32::try_from(id).ok()) {
        Some(id) if get(id).is_some() => id,
        _ => DEFAULT_SKIN_ID,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_skin_is_free() {
        let skin = get(DEFAULT_SKIN_ID).unwrap();
        assert_eq!(skin.name, "Default");
        assert!(!skin.premium);
    }

    #[test]
    fn valid_ids_pass_through() {
        assert_eq!(resolve_skin_id(Some(0)), 0);
        assert_eq!(resolve_skin_id(Some(4)), 4);
        assert_eq!(resolve_skin_id(Some(9)), 9);
    }

    #[test]
    fn premium_skins_are_not_gated() {
        assert!(get(5).unwrap().premium);
        assert_eq!(resolve_skin_id(Some(5)), 5);
    }

    #[test]
    fn invalid_ids_fall_back_to_default() {
        assert_eq!(resolve_skin_id(None), DEFAULT_SKIN_ID);
        assert_eq!(resolve_skin_id(Some(-1)), DEFAULT_SKIN_ID);
        assert_eq!(resolve_skin_id(Some(10)), DEFAULT_SKIN_ID);
        assert_eq!(resolve_skin_id(Some(i32::MAX)), DEFAULT_SKIN_ID);
    }
}
