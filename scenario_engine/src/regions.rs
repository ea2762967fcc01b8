//! Reference data about the regions: names, groupings and the default number of votes
//! used to seed a region before it is edited.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::model::RegionId;

/// Vote total used to seed a region that is unknown to the reference table.
pub const FALLBACK_REGION_TOTAL: u64 = 1000;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RegionInfo {
    pub id: RegionId,
    pub name: String,
    pub group: String,
    #[serde(rename = "defaultVotes", default)]
    pub default_votes: u64,
}

/// The closed set of regions and their groupings.
///
/// The table is read-only for the engine. Groupings are reported in the order of `groups`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RegionTable {
    groups: Vec<String>,
    regions: Vec<RegionInfo>,
}

impl RegionTable {
    pub fn new(groups: Vec<String>, regions: Vec<RegionInfo>) -> RegionTable {
        for r in regions.iter() {
            if !groups.contains(&r.group) {
                warn!(
                    "RegionTable::new: region {} belongs to undeclared group {:?}",
                    r.id, r.group
                );
            }
        }
        RegionTable { groups, regions }
    }

    /// The 27 federative units of Brazil in their 5 macro-regions.
    pub fn brazil() -> RegionTable {
        let groups: Vec<String> = ["Norte", "Nordeste", "Centro-Oeste", "Sudeste", "Sul"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let regions = BRAZIL
            .iter()
            .map(|(id, name, group, default_votes)| RegionInfo {
                id: RegionId::new(id),
                name: name.to_string(),
                group: group.to_string(),
                default_votes: *default_votes,
            })
            .collect();
        RegionTable { groups, regions }
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn regions(&self) -> &[RegionInfo] {
        &self.regions
    }

    pub fn get(&self, region: &RegionId) -> Option<&RegionInfo> {
        self.regions.iter().find(|r| r.id == *region)
    }

    pub fn group_of(&self, region: &RegionId) -> Option<&str> {
        self.get(region).map(|r| r.group.as_str())
    }

    /// The display name, or the identifier itself for unknown regions.
    pub fn name_of(&self, region: &RegionId) -> String {
        self.get(region)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| region.to_string())
    }

    pub fn regions_in<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a RegionInfo> + 'a {
        self.regions.iter().filter(move |r| r.group == group)
    }

    pub fn default_votes(&self, region: &RegionId) -> Option<u64> {
        self.get(region)
            .map(|r| r.default_votes)
            .filter(|v| *v > 0)
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        RegionTable::brazil()
    }
}

const BRAZIL: [(&str, &str, &str, u64); 27] = [
    ("BR-AC", "Acre", "Norte", 440823),
    ("BR-AL", "Alagoas", "Nordeste", 1651327),
    ("BR-AP", "Amapá", "Norte", 401595),
    ("BR-AM", "Amazonas", "Norte", 2038284),
    ("BR-BA", "Bahia", "Nordeste", 7898099),
    ("BR-CE", "Ceará", "Nordeste", 4772734),
    ("BR-DF", "Distrito Federal", "Centro-Oeste", 1611568),
    ("BR-ES", "Espírito Santo", "Sudeste", 2220920),
    ("BR-GO", "Goiás", "Centro-Oeste", 3604259),
    ("BR-MA", "Maranhão", "Nordeste", 3577907),
    ("BR-MT", "Mato Grosso", "Centro-Oeste", 1852347),
    ("BR-MS", "Mato Grosso do Sul", "Centro-Oeste", 1457128),
    ("BR-MG", "Minas Gerais", "Sudeste", 12213461),
    ("BR-PA", "Pará", "Norte", 4498354),
    ("BR-PB", "Paraíba", "Nordeste", 2226037),
    ("BR-PR", "Paraná", "Sul", 6784500),
    ("BR-PE", "Pernambuco", "Nordeste", 5191163),
    ("BR-PI", "Piauí", "Nordeste", 1824879),
    ("BR-RJ", "Rio de Janeiro", "Sudeste", 9876823),
    ("BR-RN", "Rio Grande do Norte", "Nordeste", 1941287),
    ("BR-RS", "Rio Grande do Sul", "Sul", 6957644),
    ("BR-RO", "Rondônia", "Norte", 984137),
    ("BR-RR", "Roraima", "Norte", 271314),
    ("BR-SC", "Santa Catarina", "Sul", 4676091),
    ("BR-SP", "São Paulo", "Sudeste", 27054203),
    ("BR-SE", "Sergipe", "Nordeste", 1186581),
    ("BR-TO", "Tocantins", "Norte", 809783),
];
