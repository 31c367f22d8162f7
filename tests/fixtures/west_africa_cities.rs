//! West African market towns used as route endpoints and waypoints.
//!
//! Coordinates are approximate city centres from OpenStreetMap, stored as
//! `(lon, lat)` like everything else in the crate.

/// A named location with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct City {
    pub name: &'static str,
    pub lon: f64,
    pub lat: f64,
}

impl City {
    pub const fn new(name: &'static str, lon: f64, lat: f64) -> Self {
        Self { name, lon, lat }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }
}

// ============================================================================
// Sahel
// ============================================================================

pub const OUAGADOUGOU: City = City::new("Ouagadougou", -1.5197, 12.3714);
pub const BOBO_DIOULASSO: City = City::new("Bobo-Dioulasso", -4.2979, 11.1771);
pub const BAMAKO: City = City::new("Bamako", -8.0029, 12.6392);
pub const SIKASSO: City = City::new("Sikasso", -5.6667, 11.3167);
pub const NIAMEY: City = City::new("Niamey", 2.1098, 13.5116);
pub const FADA_NGOURMA: City = City::new("Fada N'gourma", 0.3569, 12.0616);

// ============================================================================
// Coast and middle belt
// ============================================================================

pub const ACCRA: City = City::new("Accra", -0.1870, 5.6037);
pub const KUMASI: City = City::new("Kumasi", -1.6244, 6.6885);
pub const TAMALE: City = City::new("Tamale", -0.8393, 9.4008);
pub const ABIDJAN: City = City::new("Abidjan", -4.0083, 5.3600);
pub const BOUAKE: City = City::new("Bouaké", -5.0306, 7.6906);
pub const LOME: City = City::new("Lomé", 1.2255, 6.1375);
pub const KARA: City = City::new("Kara", 1.1861, 9.5511);
pub const COTONOU: City = City::new("Cotonou", 2.4183, 6.3654);
pub const PARAKOU: City = City::new("Parakou", 2.6284, 9.3372);
