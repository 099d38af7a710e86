use crate::mesh::{Layer, MeshLayer};
use crate::planet::TectonicPlanet;
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Plates,
    Elevation,
}

/// Raw mesh data that can be used by any rendering engine
#[derive(Debug, Clone)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    /// Owning plate per vertex, -1 when unassigned
    pub plate_ids: Vec<i32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Builds renderer input for one layer, or `None` if the layer does not exist yet.
    ///
    /// Crust vertices are placed by their plate's transform; Data and Render vertices stay
    /// at their fixed directions. All are lifted by scaled elevation.
    pub fn from_planet(planet: &TectonicPlanet, layer: MeshLayer, view_mode: ViewMode) -> Option<Self> {
        let source: &Layer = planet.layer(layer)?;
        let max_elevation = planet.config().uplift.max_elevation;

        let positions: Vec<[f32; 3]> = (0..source.mesh.vertex_count())
            .map(|v| {
                let position = match layer {
                    MeshLayer::Crust => planet.crust_vertex_position(v).unwrap_or(source.mesh.vertices[v]),
                    MeshLayer::Data | MeshLayer::Render => {
                        source.mesh.vertices[v] * planet.lifted_radius(source.points[v].elevation)
                    }
                };
                position.to_array()
            })
            .collect();

        let normals = positions
            .iter()
            .map(|p| Vec3::from(*p).normalize_or_zero().to_array())
            .collect();

        let colors = source
            .points
            .iter()
            .map(|p| match view_mode {
                ViewMode::Plates => plate_color(p.plate),
                ViewMode::Elevation => elevation_color(p.elevation, max_elevation),
            })
            .collect();

        Some(MeshData {
            positions,
            normals,
            colors,
            plate_ids: source.points.iter().map(|p| p.plate_code()).collect(),
            indices: source.mesh.triangle_indices(),
        })
    }
}

impl TectonicPlanet {
    pub fn mesh_data(&self, layer: MeshLayer) -> Option<MeshData> {
        MeshData::from_planet(self, layer, ViewMode::default())
    }
}

/// Distinct hue per plate, spread by the golden angle. Unassigned vertices are grey.
fn plate_color(plate: Option<usize>) -> [f32; 4] {
    let Some(plate) = plate else {
        return [0.5, 0.5, 0.5, 1.0];
    };
    let hue = (plate as f32 * 0.618_034).fract();
    let [r, g, b] = hue_to_rgb(hue);
    [r * 0.8 + 0.1, g * 0.8 + 0.1, b * 0.8 + 0.1, 1.0]
}

fn hue_to_rgb(hue: f32) -> [f32; 3] {
    let h = hue * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    match h as u32 {
        0 => [1.0, x, 0.0],
        1 => [x, 1.0, 0.0],
        2 => [0.0, 1.0, x],
        3 => [0.0, x, 1.0],
        4 => [x, 0.0, 1.0],
        _ => [1.0, 0.0, x],
    }
}

fn elevation_color(elevation: f32, max_elevation: f32) -> [f32; 4] {
    if elevation < 0.0 {
        // Deeper water is darker
        let depth = (-elevation / max_elevation).clamp(0.0, 1.0);
        [0.1 - depth * 0.08, 0.3 - depth * 0.2, 0.7 - depth * 0.4, 1.0]
    } else {
        let height = (elevation / max_elevation).clamp(0.0, 1.0);
        if height > 0.7 {
            [0.95, 0.95, 1.0, 1.0]
        } else {
            [0.2 + height * 0.5, 0.5 - height * 0.2, 0.15 + height * 0.1, 1.0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TectonicsConfig;
    use crate::mesh::icosphere;
    use rstest::rstest;

    fn planet() -> TectonicPlanet {
        let mut planet = TectonicPlanet::new(icosphere(2), TectonicsConfig::default(), 10).unwrap();
        planet.initialize_random_crust();
        planet
    }

    #[rstest]
    #[case(MeshLayer::Crust)]
    #[case(MeshLayer::Data)]
    fn buffers_have_matching_lengths(#[case] layer: MeshLayer) {
        let planet = planet();
        let data = planet.mesh_data(layer).unwrap();
        let vertices = planet.layer(layer).unwrap().mesh.vertex_count();
        assert_eq!(data.positions.len(), vertices);
        assert_eq!(data.normals.len(), vertices);
        assert_eq!(data.colors.len(), vertices);
        assert_eq!(data.plate_ids.len(), vertices);
        assert_eq!(data.indices.len(), planet.layer(layer).unwrap().mesh.triangle_count() * 3);
        assert!(data.indices.iter().all(|&i| (i as usize) < vertices));
    }

    #[test]
    fn missing_layers_produce_nothing() {
        let planet = TectonicPlanet::new(icosphere(1), TectonicsConfig::default(), 10).unwrap();
        assert!(planet.mesh_data(MeshLayer::Crust).is_none());
        assert!(planet.mesh_data(MeshLayer::Render).is_none());
        let data = planet.mesh_data(MeshLayer::Data).unwrap();
        assert!(data.plate_ids.iter().all(|&p| p == -1));
    }

    #[test]
    fn positions_sit_at_lifted_radius() {
        let planet = planet();
        let data = MeshData::from_planet(&planet, MeshLayer::Data, ViewMode::Elevation).unwrap();
        let scale = planet.config().generation.elevation_scale;
        for (p, point) in data.positions.iter().zip(&planet.data().points) {
            let expected = planet.radius() + point.elevation * scale;
            assert!((Vec3::from(*p).length() - expected).abs() < 1e-2);
        }
    }

    #[test]
    fn hues_cover_all_sextants() {
        for k in 0..6 {
            let rgb = hue_to_rgb(k as f32 / 6.0 + 0.01);
            assert!(rgb.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }
}
