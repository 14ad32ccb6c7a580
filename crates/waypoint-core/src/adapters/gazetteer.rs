//! Offline province lookup for the mathematical source.
//!
//! Coordinates are the province seat, not the geometric centre of the
//! province, so a province-level answer lands on the main town.

use crate::scoring::{is_thai, normalize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Province {
    pub name: &'static str,
    pub thai_name: &'static str,
    /// Extra spellings, already lowercase.
    pub aliases: &'static [&'static str],
    pub lat: f64,
    pub lng: f64,
    /// Leading two postcode digits, when they identify the province alone.
    pub postcode_prefix: Option<&'static str>,
}

/// How a province was picked out of the query text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GazetteerHit {
    Name(&'static Province),
    Postcode(&'static Province),
}

impl GazetteerHit {
    pub fn province(self) -> &'static Province {
        match self {
            Self::Name(province) | Self::Postcode(province) => province,
        }
    }
}

pub(crate) const THAILAND_CENTROID: (f64, f64) = (15.8700, 100.9925);

macro_rules! province {
    ($name:literal, $thai:literal, [$($alias:literal),*], $lat:literal, $lng:literal, $prefix:expr) => {
        Province {
            name: $name,
            thai_name: $thai,
            aliases: &[$($alias),*],
            lat: $lat,
            lng: $lng,
            postcode_prefix: $prefix,
        }
    };
}

pub(crate) static PROVINCES: [Province; 30] = [
    province!("Bangkok", "กรุงเทพมหานคร", ["krung thep", "krung thep maha nakhon", "bkk", "กรุงเทพ", "กทม"], 13.7563, 100.5018, Some("10")),
    province!("Nonthaburi", "นนทบุรี", [], 13.8621, 100.5144, Some("11")),
    province!("Pathum Thani", "ปทุมธานี", ["pathumthani"], 14.0208, 100.5250, Some("12")),
    // Shares the 10xxx range with Bangkok.
    province!("Samut Prakan", "สมุทรปราการ", ["samutprakan"], 13.5991, 100.5998, None),
    province!("Chon Buri", "ชลบุรี", ["chonburi"], 13.3611, 100.9847, Some("20")),
    province!("Rayong", "ระยอง", [], 12.6814, 101.2816, Some("21")),
    province!("Chiang Mai", "เชียงใหม่", ["chiangmai"], 18.7883, 98.9853, Some("50")),
    province!("Chiang Rai", "เชียงราย", ["chiangrai"], 19.9105, 99.8406, Some("57")),
    province!("Khon Kaen", "ขอนแก่น", ["khonkaen"], 16.4322, 102.8236, Some("40")),
    province!("Nakhon Ratchasima", "นครราชสีมา", ["korat", "khorat", "โคราช"], 14.9799, 102.0978, Some("30")),
    province!("Phuket", "ภูเก็ต", [], 7.8804, 98.3923, Some("83")),
    province!("Songkhla", "สงขลา", [], 7.1898, 100.5951, Some("90")),
    province!("Ayutthaya", "พระนครศรีอยุธยา", ["phra nakhon si ayutthaya", "อยุธยา"], 14.3532, 100.5689, Some("13")),
    province!("Saraburi", "สระบุรี", [], 14.5289, 100.9101, Some("18")),
    province!("Chachoengsao", "ฉะเชิงเทรา", [], 13.6904, 101.0779, Some("24")),
    province!("Nakhon Pathom", "นครปฐม", [], 13.8199, 100.0622, Some("73")),
    province!("Samut Sakhon", "สมุทรสาคร", ["samutsakhon"], 13.5475, 100.2744, Some("74")),
    province!("Udon Thani", "อุดรธานี", ["udonthani"], 17.4138, 102.7872, Some("41")),
    province!("Ubon Ratchathani", "อุบลราชธานี", ["ubon"], 15.2287, 104.8564, Some("34")),
    province!("Phitsanulok", "พิษณุโลก", [], 16.8211, 100.2659, Some("65")),
    province!("Nakhon Sawan", "นครสวรรค์", [], 15.7047, 100.1372, Some("60")),
    province!("Surat Thani", "สุราษฎร์ธานี", ["suratthani"], 9.1382, 99.3215, Some("84")),
    province!("Lop Buri", "ลพบุรี", ["lopburi"], 14.7995, 100.6534, Some("15")),
    province!("Prachin Buri", "ปราจีนบุรี", ["prachinburi"], 14.0509, 101.3717, Some("25")),
    province!("Ratchaburi", "ราชบุรี", [], 13.5283, 99.8134, Some("70")),
    province!("Kanchanaburi", "กาญจนบุรี", [], 14.0228, 99.5328, Some("71")),
    province!("Phetchaburi", "เพชรบุรี", [], 13.1119, 99.9397, Some("76")),
    province!("Prachuap Khiri Khan", "ประจวบคีรีขันธ์", [], 11.8124, 99.7973, Some("77")),
    province!("Lampang", "ลำปาง", [], 18.2888, 99.4909, Some("52")),
    province!("Nakhon Si Thammarat", "นครศรีธรรมราช", [], 8.4304, 99.9631, Some("80")),
];

/// Finds the province named in `address`, falling back to its postcode.
///
/// The longest matching name wins, so "Nakhon Si Thammarat" is never
/// mistaken for a shorter name it happens to contain.
pub(crate) fn lookup(address: &str) -> Option<GazetteerHit> {
    let text = normalize(address);
    let padded = format!(" {text} ");

    let by_name = PROVINCES
        .iter()
        .filter_map(|province| {
            names(province)
                .filter(|name| contains_name(&text, &padded, name))
                .map(|name| name.chars().count())
                .max()
                .map(|len| (province, len))
        })
        .max_by_key(|(_, len)| *len)
        .map(|(province, _)| GazetteerHit::Name(province));

    by_name.or_else(|| {
        let prefix = postcode(&text)?.get(..2)?.to_owned();
        PROVINCES
            .iter()
            .find(|province| province.postcode_prefix == Some(prefix.as_str()))
            .map(GazetteerHit::Postcode)
    })
}

fn names(province: &'static Province) -> impl Iterator<Item = &'static str> {
    [province.name, province.thai_name]
        .into_iter()
        .chain(province.aliases.iter().copied())
}

fn contains_name(text: &str, padded: &str, name: &str) -> bool {
    let name = normalize(name);
    if name.chars().any(is_thai) {
        // Thai is written without spaces between words.
        text.contains(&name)
    } else {
        padded.contains(&format!(" {name} "))
    }
}

fn postcode(text: &str) -> Option<&str> {
    text.split(' ')
        .find(|token| token.len() == 5 && token.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_province_by_english_name() {
        let hit = lookup("70/1 Moo 4, Khlong Nueng, Khlong Luang, Pathum Thani 12120").expect("hit");
        assert!(matches!(hit, GazetteerHit::Name(p) if p.name == "Pathum Thani"));
    }

    #[test]
    fn finds_province_by_thai_name() {
        let hit = lookup("ต.คลองหนึ่ง อ.คลองหลวง จ.ปทุมธานี").expect("hit");
        assert_eq!(hit.province().name, "Pathum Thani");
    }

    #[test]
    fn prefers_longest_name() {
        let hit = lookup("Mueang, Nakhon Si Thammarat").expect("hit");
        assert_eq!(hit.province().name, "Nakhon Si Thammarat");

        let hit = lookup("Chiang Rai clock tower").expect("hit");
        assert_eq!(hit.province().name, "Chiang Rai");
    }

    #[test]
    fn latin_names_need_word_boundaries() {
        assert!(lookup("Rayongville Street").is_none());
    }

    #[test]
    fn falls_back_to_postcode_prefix() {
        let hit = lookup("99 Moo 1, 50200").expect("hit");
        assert!(matches!(hit, GazetteerHit::Postcode(p) if p.name == "Chiang Mai"));
    }

    #[test]
    fn shared_postcode_prefix_resolves_to_bangkok() {
        let hit = lookup("Soi 5, 10540").expect("hit");
        assert_eq!(hit.province().name, "Bangkok");
    }

    #[test]
    fn unknown_text_has_no_hit() {
        assert!(lookup("somewhere unnamed").is_none());
    }

    #[test]
    fn every_table_point_is_valid_wgs84() {
        let (lat, lng) = THAILAND_CENTROID;
        assert!(crate::Coordinates::new(lat, lng).is_ok());
        for province in &PROVINCES {
            assert!(
                crate::Coordinates::new(province.lat, province.lng).is_ok(),
                "{}",
                province.name
            );
        }
    }
}
