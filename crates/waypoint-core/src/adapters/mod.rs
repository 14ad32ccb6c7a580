mod gazetteer;
mod google_maps;
mod mathematical;
mod openstreetmap;

pub use google_maps::{GoogleMapsAdapter, GOOGLE_MAPS_BASE_URL};
pub use mathematical::MathematicalSource;
pub use openstreetmap::{OpenStreetMapAdapter, NOMINATIM_BASE_URL, OSRM_BASE_URL};
