//! Parsing and representation of TTP instances.
//!
//! Handles the TTP benchmark file format (TSP-LIB style header plus an
//! `ITEMS SECTION`) and manages city coordinates, item assignments, knapsack
//! capacity and the speed bounds of the thief.

use crate::error::{Result, SolverError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

/// A city in the TTP instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    /// City identifier (1-indexed in files, 0-indexed internally)
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Indices into [`TtpInstance::items`] of the items located here
    pub items: Vec<usize>,
}

impl City {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        City { id, x, y, items: Vec::new() }
    }
}

/// An item that can be collected into the knapsack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier (1-indexed in files, 0-indexed internally)
    pub id: usize,
    /// Value gained when the item is carried
    pub value: i64,
    /// Weight added to the knapsack when picked up (always > 0)
    pub weight: i64,
    /// Index of the city holding this item
    pub city: usize,
}

impl Item {
    /// Value/weight density. Well-defined because `weight > 0` is enforced
    /// at load time.
    #[inline]
    pub fn ratio(&self) -> f64 {
        self.value as f64 / self.weight as f64
    }
}

/// A complete TTP instance. Serializable for reporting; reconstruct via the
/// parser or [`TtpInstance::new`] so the distance matrix is always populated.
#[derive(Debug, Clone, Serialize)]
pub struct TtpInstance {
    /// Name of the instance
    pub name: String,
    /// Knapsack data type declared by the file (e.g. "bounded strongly corr")
    pub knapsack_data_type: String,
    /// Number of cities
    pub dimension: usize,
    /// Knapsack capacity
    pub capacity: i64,
    /// Travel speed with a full knapsack
    pub min_speed: f64,
    /// Travel speed with an empty knapsack
    pub max_speed: f64,
    /// Renting ratio declared by the file (not part of the objective)
    pub renting_ratio: f64,
    /// All cities, 0-indexed
    pub cities: Vec<City>,
    /// All items, 0-indexed; each city lists its own item indices
    pub items: Vec<Item>,
    /// Precomputed Euclidean distance matrix
    #[serde(skip)]
    pub distance_matrix: Vec<Vec<f64>>,
}

impl TtpInstance {
    /// Build an instance directly from cities and items, recomputing the
    /// distance matrix and the per-city item lists.
    pub fn new(
        name: &str,
        mut cities: Vec<City>,
        items: Vec<Item>,
        capacity: i64,
        min_speed: f64,
        max_speed: f64,
    ) -> Result<Self> {
        for city in &mut cities {
            city.items.clear();
        }
        for (idx, item) in items.iter().enumerate() {
            // `city.items` and `KnapsackSelection` index by item id, so ids
            // must equal positions in `items`.
            if item.id != idx {
                return Err(SolverError::Data(format!(
                    "item ids must be contiguous: expected id {} at position {}, found {}",
                    idx, idx, item.id
                )));
            }
            if item.weight <= 0 {
                return Err(SolverError::Data(format!(
                    "item {} has non-positive weight {}",
                    item.id + 1,
                    item.weight
                )));
            }
            if item.city >= cities.len() {
                return Err(SolverError::Data(format!(
                    "item {} assigned to unknown city {}",
                    item.id + 1,
                    item.city + 1
                )));
            }
            cities[item.city].items.push(item.id);
        }
        if capacity < 0 {
            return Err(SolverError::Data(format!("negative capacity {}", capacity)));
        }

        let distance_matrix = Self::compute_distance_matrix(&cities);

        Ok(TtpInstance {
            name: name.to_string(),
            knapsack_data_type: String::new(),
            dimension: cities.len(),
            capacity,
            min_speed,
            max_speed,
            renting_ratio: 0.0,
            cities,
            items,
            distance_matrix,
        })
    }

    /// Parse a TTP instance from a benchmark format file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| SolverError::Data(format!("cannot open file: {}", e)))?;
        Self::parse(BufReader::new(file))
    }

    /// Parse a TTP instance from an in-memory string.
    pub fn from_str_data(data: &str) -> Result<Self> {
        Self::parse(Cursor::new(data))
    }

    /// Parse the TTP benchmark format from any buffered reader.
    fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut name = String::new();
        let mut knapsack_data_type = String::new();
        let mut dimension = 0usize;
        let mut item_count = 0usize;
        let mut capacity = 0i64;
        let mut min_speed = 0.0f64;
        let mut max_speed = 0.0f64;
        let mut renting_ratio = 0.0f64;
        let mut coords: Vec<(usize, f64, f64)> = Vec::new();
        let mut item_rows: Vec<(usize, i64, i64, usize)> = Vec::new();

        let mut section = String::new();

        for line in reader.lines() {
            let line = line.map_err(|e| SolverError::Data(format!("read error: {}", e)))?;
            let line = line.trim();

            if line.is_empty() || line == "EOF" {
                continue;
            }

            if line.starts_with("NODE_COORD_SECTION") {
                section = "coords".to_string();
                continue;
            }
            if line.starts_with("ITEMS SECTION") {
                section = "items".to_string();
                continue;
            }

            if section.is_empty() {
                if let Some((key, value)) = line.split_once(':') {
                    let key = key.trim();
                    let value = value.trim();

                    match key {
                        "PROBLEM NAME" | "NAME" => name = value.to_string(),
                        "KNAPSACK DATA TYPE" => knapsack_data_type = value.to_string(),
                        "DIMENSION" => {
                            dimension = value
                                .parse()
                                .map_err(|_| SolverError::Data("invalid dimension".into()))?
                        }
                        "NUMBER OF ITEMS" => {
                            item_count = value
                                .parse()
                                .map_err(|_| SolverError::Data("invalid item count".into()))?
                        }
                        "CAPACITY OF KNAPSACK" | "CAPACITY" => {
                            capacity = value
                                .parse()
                                .map_err(|_| SolverError::Data("invalid capacity".into()))?
                        }
                        "MIN SPEED" => {
                            min_speed = value
                                .parse()
                                .map_err(|_| SolverError::Data("invalid min speed".into()))?
                        }
                        "MAX SPEED" => {
                            max_speed = value
                                .parse()
                                .map_err(|_| SolverError::Data("invalid max speed".into()))?
                        }
                        "RENTING RATIO" => {
                            renting_ratio = value
                                .parse()
                                .map_err(|_| SolverError::Data("invalid renting ratio".into()))?
                        }
                        "EDGE_WEIGHT_TYPE" => {}
                        _ => {}
                    }
                }
                continue;
            }

            match section.as_str() {
                "coords" => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() >= 3 {
                        let id: usize = parts[0]
                            .parse()
                            .map_err(|_| SolverError::Data("invalid city id".into()))?;
                        let x: f64 = parts[1]
                            .parse()
                            .map_err(|_| SolverError::Data("invalid x coordinate".into()))?;
                        let y: f64 = parts[2]
                            .parse()
                            .map_err(|_| SolverError::Data("invalid y coordinate".into()))?;
                        coords.push((id, x, y));
                    }
                }
                "items" => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() >= 4 {
                        let id: usize = parts[0]
                            .parse()
                            .map_err(|_| SolverError::Data("invalid item id".into()))?;
                        let value: i64 = parts[1]
                            .parse()
                            .map_err(|_| SolverError::Data("invalid item value".into()))?;
                        let weight: i64 = parts[2]
                            .parse()
                            .map_err(|_| SolverError::Data("invalid item weight".into()))?;
                        let city: usize = parts[3]
                            .parse()
                            .map_err(|_| SolverError::Data("invalid item city".into()))?;
                        item_rows.push((id, value, weight, city));
                    }
                }
                _ => {}
            }
        }

        if coords.is_empty() {
            return Err(SolverError::Data("no cities found".into()));
        }
        if dimension == 0 {
            dimension = coords.len();
        }
        if coords.len() != dimension {
            return Err(SolverError::Data(format!(
                "expected {} cities, found {}",
                dimension,
                coords.len()
            )));
        }
        if item_count != 0 && item_rows.len() != item_count {
            return Err(SolverError::Data(format!(
                "expected {} items, found {}",
                item_count,
                item_rows.len()
            )));
        }

        // File ids are 1-based and must be listed contiguously, otherwise the
        // 0-indexed internal ids would not match their positions.
        let cities: Vec<City> = coords
            .iter()
            .enumerate()
            .map(|(i, &(id, x, y))| {
                if id != i + 1 {
                    return Err(SolverError::Data(format!(
                        "city ids must be 1-based and contiguous: row {} has id {}",
                        i + 1,
                        id
                    )));
                }
                Ok(City::new(id - 1, x, y))
            })
            .collect::<Result<_>>()?;

        let items: Vec<Item> = item_rows
            .iter()
            .enumerate()
            .map(|(i, &(id, value, weight, city))| {
                if id != i + 1 {
                    return Err(SolverError::Data(format!(
                        "item ids must be 1-based and contiguous: row {} has id {}",
                        i + 1,
                        id
                    )));
                }
                if city == 0 {
                    return Err(SolverError::Data(format!(
                        "item {} references city 0; city numbers are 1-based",
                        id
                    )));
                }
                Ok(Item {
                    id: id - 1,
                    value,
                    weight,
                    city: city - 1,
                })
            })
            .collect::<Result<_>>()?;

        let mut instance = Self::new("", cities, items, capacity, min_speed, max_speed)?;
        instance.name = name;
        instance.knapsack_data_type = knapsack_data_type;
        instance.renting_ratio = renting_ratio;
        Ok(instance)
    }

    /// Compute the Euclidean distance matrix.
    fn compute_distance_matrix(cities: &[City]) -> Vec<Vec<f64>> {
        let n = cities.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dx = cities[i].x - cities[j].x;
                    let dy = cities[i].y - cities[j].y;
                    matrix[i][j] = (dx * dx + dy * dy).sqrt();
                }
            }
        }

        matrix
    }

    /// Distance between two cities.
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    /// Number of items in the instance.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total weight of every item in the instance.
    pub fn total_item_weight(&self) -> i64 {
        self.items.iter().map(|it| it.weight).sum()
    }

    /// Total value of every item in the instance.
    pub fn total_item_value(&self) -> i64 {
        self.items.iter().map(|it| it.value).sum()
    }

    /// Get statistics about the instance.
    pub fn statistics(&self) -> InstanceStatistics {
        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.dimension {
            for j in i + 1..self.dimension {
                distances.push(self.distance(i, j));
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        let cities_with_items = self.cities.iter().filter(|c| !c.items.is_empty()).count();

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension,
            item_count: self.item_count(),
            cities_with_items,
            capacity: self.capacity,
            min_speed: self.min_speed,
            max_speed: self.max_speed,
            total_item_weight: self.total_item_weight(),
            total_item_value: self.total_item_value(),
            avg_distance,
            max_distance,
        }
    }
}

/// Statistics about a TTP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub item_count: usize,
    pub cities_with_items: usize,
    pub capacity: i64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub total_item_weight: i64,
    pub total_item_value: i64,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.dimension)?;
        writeln!(f, "  Items: {} (at {} cities)", self.item_count, self.cities_with_items)?;
        writeln!(f, "  Capacity: {}", self.capacity)?;
        writeln!(f, "  Speed: {} (full) .. {} (empty)", self.min_speed, self.max_speed)?;
        writeln!(f, "  Total item weight: {}", self.total_item_weight)?;
        writeln!(f, "  Total item value: {}", self.total_item_value)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
PROBLEM NAME: sample
KNAPSACK DATA TYPE: bounded strongly corr
DIMENSION: 4
NUMBER OF ITEMS: 3
CAPACITY OF KNAPSACK: 80
MIN SPEED: 0.1
MAX SPEED: 1
RENTING RATIO: 0.5
EDGE_WEIGHT_TYPE: CEIL_2D
NODE_COORD_SECTION	(INDEX, X, Y):
1 0 0
2 10 0
3 10 10
4 0 10
ITEMS SECTION	(INDEX, PROFIT, WEIGHT, ASSIGNED NODE NUMBER):
1 100 30 2
2 40 40 3
3 60 20 4
EOF
";

    #[test]
    fn test_parse_sample() {
        let instance = TtpInstance::from_str_data(SAMPLE).unwrap();

        assert_eq!(instance.name, "sample");
        assert_eq!(instance.dimension, 4);
        assert_eq!(instance.capacity, 80);
        assert_eq!(instance.item_count(), 3);
        assert!((instance.min_speed - 0.1).abs() < 1e-12);
        assert!((instance.max_speed - 1.0).abs() < 1e-12);
        assert!((instance.renting_ratio - 0.5).abs() < 1e-12);

        // Items are attached to their home cities (0-indexed).
        assert_eq!(instance.cities[1].items, vec![0]);
        assert_eq!(instance.cities[2].items, vec![1]);
        assert_eq!(instance.cities[3].items, vec![2]);
        assert!(instance.cities[0].items.is_empty());

        assert_eq!(instance.items[0].value, 100);
        assert_eq!(instance.items[0].weight, 30);
        assert!((instance.items[0].ratio() - 100.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_matrix() {
        let instance = TtpInstance::from_str_data(SAMPLE).unwrap();
        assert!((instance.distance(0, 1) - 10.0).abs() < 1e-10);
        assert!((instance.distance(0, 2) - 200.0f64.sqrt()).abs() < 1e-10);
        assert!((instance.distance(2, 0) - instance.distance(0, 2)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_weight() {
        let bad = SAMPLE.replace("1 100 30 2", "1 100 0 2");
        let err = TtpInstance::from_str_data(&bad).unwrap_err();
        assert!(matches!(err, SolverError::Data(_)));
    }

    #[test]
    fn test_rejects_dimension_mismatch() {
        let bad = SAMPLE.replace("DIMENSION: 4", "DIMENSION: 5");
        let err = TtpInstance::from_str_data(&bad).unwrap_err();
        assert!(matches!(err, SolverError::Data(_)));
    }

    #[test]
    fn test_rejects_zero_based_item_id() {
        // A 0-based item id must surface as a data error, not wrap around.
        let bad = SAMPLE.replace("1 100 30 2", "0 100 30 2");
        let err = TtpInstance::from_str_data(&bad).unwrap_err();
        assert!(matches!(err, SolverError::Data(_)));
    }

    #[test]
    fn test_rejects_zero_based_city_id() {
        let bad = SAMPLE.replace("1 0 0", "0 0 0");
        let err = TtpInstance::from_str_data(&bad).unwrap_err();
        assert!(matches!(err, SolverError::Data(_)));
    }

    #[test]
    fn test_rejects_zero_city_reference_in_item() {
        let bad = SAMPLE.replace("1 100 30 2", "1 100 30 0");
        let err = TtpInstance::from_str_data(&bad).unwrap_err();
        assert!(matches!(err, SolverError::Data(_)));
    }

    #[test]
    fn test_rejects_non_contiguous_item_ids() {
        let bad = SAMPLE.replace("2 40 40 3", "5 40 40 3");
        let err = TtpInstance::from_str_data(&bad).unwrap_err();
        assert!(matches!(err, SolverError::Data(_)));
    }

    #[test]
    fn test_new_rejects_item_id_position_mismatch() {
        let cities = vec![City::new(0, 0.0, 0.0), City::new(1, 1.0, 0.0)];
        let items = vec![Item { id: 1, value: 10, weight: 5, city: 0 }];
        let err = TtpInstance::new("bad", cities, items, 10, 0.1, 1.0).unwrap_err();
        assert!(matches!(err, SolverError::Data(_)));
    }

    #[test]
    fn test_serialization_skips_distance_matrix() {
        let instance = TtpInstance::from_str_data(SAMPLE).unwrap();
        let json = serde_json::to_value(&instance).unwrap();
        assert!(json.get("distance_matrix").is_none());
        assert_eq!(json["dimension"], 4);
    }
}
