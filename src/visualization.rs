//! SVG visualization of the best tour.
//!
//! Renders the engine's best-tour report as a directed graph: tour edges plus
//! cities colored by whether any of their items is carried.

use crate::engine::TourReport;
use crate::instance::TtpInstance;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// City marker radius
    pub node_radius: f64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 8.0,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an SVG rendering of the best tour.
    pub fn generate_svg(&self, instance: &TtpInstance, report: &TourReport) -> String {
        let mut svg = String::new();

        let (min_x, max_x, min_y, max_y) = self.bounds(instance);

        let scale_x = (self.width - 2.0 * self.margin) / (max_x - min_x).max(1.0);
        let scale_y = (self.height - 2.0 * self.margin) / (max_y - min_y).max(1.0);
        let scale = scale_x.min(scale_y);

        let tx = |x: f64| self.margin + (x - min_x) * scale;
        let ty = |y: f64| self.height - self.margin - (y - min_y) * scale;

        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .carried {{ fill: #2ecc71; stroke: #27ae60; stroke-width: 2; }}
    .skipped {{ fill: #3498db; stroke: #2c3e50; stroke-width: 2; }}
    .edge {{ stroke: #34495e; stroke-width: 2; fill: none; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            self.width, self.height, self.width, self.height
        ));

        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">Instance: {} | Fitness: {:.2}</text>
"##,
            self.margin, instance.name, report.fitness
        ));

        // Arrowhead marker for tour direction.
        svg.push_str(
            r##"<defs>
<marker id="arrow" markerWidth="10" markerHeight="7" refX="9" refY="3.5" orient="auto">
    <polygon points="0 0, 10 3.5, 0 7" fill="#34495e"/>
</marker>
</defs>
"##,
        );

        for &(from, to) in &report.edges {
            let a = &instance.cities[from];
            let b = &instance.cities[to];
            svg.push_str(&format!(
                r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" class="edge" marker-end="url(#arrow)"/>
"##,
                tx(a.x),
                ty(a.y),
                tx(b.x),
                ty(b.y)
            ));
        }

        for (i, city) in instance.cities.iter().enumerate() {
            let class = if report.carried.get(i).copied().unwrap_or(false) {
                "carried"
            } else {
                "skipped"
            };
            svg.push_str(&format!(
                r##"<circle cx="{:.1}" cy="{:.1}" r="{}" class="{}"/>
<text x="{:.1}" y="{:.1}" class="label">{}</text>
"##,
                tx(city.x),
                ty(city.y),
                self.node_radius,
                class,
                tx(city.x) + self.node_radius + 2.0,
                ty(city.y) - self.node_radius - 2.0,
                i + 1
            ));
        }

        svg.push_str("</svg>\n");
        svg
    }

    /// Write an SVG string to disk.
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())
    }

    fn bounds(&self, instance: &TtpInstance) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for city in &instance.cities {
            min_x = min_x.min(city.x);
            max_x = max_x.max(city.x);
            min_y = min_y.min(city.y);
            max_y = max_y.max(city.y);
        }

        (min_x, max_x, min_y, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{City, Item};

    #[test]
    fn test_svg_contains_all_cities_and_edges() {
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 10.0, 0.0),
            City::new(2, 10.0, 10.0),
        ];
        let items = vec![Item { id: 0, value: 5, weight: 1, city: 1 }];
        let instance = TtpInstance::new("viz", cities, items, 5, 0.5, 1.0).unwrap();

        let report = TourReport {
            edges: vec![(0, 1), (1, 2), (2, 0)],
            carried: vec![false, true, false],
            fitness: -12.3,
        };

        let svg = Visualizer::new().generate_svg(&instance, &report);
        assert!(svg.starts_with("<?xml"));
        assert!(svg.ends_with("</svg>\n"));
        assert_eq!(svg.matches("<line").count(), 3);
        assert_eq!(svg.matches("<circle").count(), 3);
        assert_eq!(svg.matches("class=\"carried\"").count(), 1);
        assert_eq!(svg.matches("class=\"skipped\"").count(), 2);
    }
}
