//! Binary save files for a whole planet.
//!
//! Every scalar is a little-endian 4-byte value and every list is preceded by its count.
//! Record order: tectonics flag, radius, step counters, engine state, Data vertices,
//! Crust vertices (when tectonics), triangles with their noise vectors, plates (when
//! tectonics), render flag and the Render layer. BVHs, membership, borders and the
//! overlap matrix are derived again on load.

use crate::config::TectonicsConfig;
use crate::error::{Result, TectonicsError};
use crate::mesh::{Layer, Mesh, OrogenyType, PointData, Triangle};
use crate::planet::{Plate, TectonicPlanet};
use crate::random::{EngineState, RandomEngine};
use crate::stream::{BinaryReader, BinaryWriter, reserve_for};
use glam::{Quat, Vec3};
use log::{error, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

struct VertexRecords {
    positions: Vec<Vec3>,
    points: Vec<PointData>,
    neighbors: Vec<Vec<usize>>,
    incident: Vec<Vec<usize>>,
}

fn write_vec3<W: Write>(w: &mut BinaryWriter<W>, v: Vec3) -> Result<()> {
    w.write_f32(v.x)?;
    w.write_f32(v.y)?;
    w.write_f32(v.z)
}

fn read_vec3<R: Read>(r: &mut BinaryReader<R>, context: &'static str) -> Result<Vec3> {
    Ok(Vec3::new(r.read_f32(context)?, r.read_f32(context)?, r.read_f32(context)?))
}

fn write_index_list<W: Write>(w: &mut BinaryWriter<W>, list: &[usize]) -> Result<()> {
    w.write_count(list.len())?;
    list.iter().try_for_each(|&i| w.write_count(i))
}

fn read_index_list<R: Read>(r: &mut BinaryReader<R>, bound: usize, context: &'static str) -> Result<Vec<usize>> {
    let count = r.read_count(context)?;
    (0..count).map(|_| r.read_index(bound, context)).collect()
}

fn write_layer_vertices<W: Write>(w: &mut BinaryWriter<W>, layer: &Layer) -> Result<()> {
    let mesh = &layer.mesh;
    w.write_count(mesh.vertex_count())?;
    for (v, point) in layer.points.iter().enumerate() {
        write_vec3(w, mesh.vertices[v])?;
        w.write_f32(point.elevation)?;
        w.write_f32(point.thickness)?;
        w.write_i32(point.plate_code())?;
        w.write_f32(point.age)?;
        w.write_i32(point.orogeny.to_code())?;
        write_index_list(w, &mesh.vertex_neighbors[v])?;
        write_index_list(w, &mesh.vertex_triangles[v])?;
    }
    Ok(())
}

/// Reads vertex records. Incident-triangle indices can only be range-checked once the
/// triangle count is known, which is done in [`rebuild_layer`].
fn read_layer_vertices<R: Read>(r: &mut BinaryReader<R>) -> Result<VertexRecords> {
    let count = r.read_count("vertex count")?;
    let reserved = reserve_for(count);
    let mut records = VertexRecords {
        positions: Vec::with_capacity(reserved),
        points: Vec::with_capacity(reserved),
        neighbors: Vec::with_capacity(reserved),
        incident: Vec::with_capacity(reserved),
    };
    for _ in 0..count {
        records.positions.push(read_vec3(r, "vertex position")?);
        let elevation = r.read_f32("vertex elevation")?;
        let thickness = r.read_f32("vertex thickness")?;
        let plate = match r.read_i32("vertex plate")? {
            -1 => None,
            p if p >= 0 => Some(p as usize),
            other => return Err(TectonicsError::Format(format!("invalid plate id {other}"))),
        };
        let age = r.read_f32("vertex age")?;
        let code = r.read_i32("vertex orogeny")?;
        let orogeny = OrogenyType::from_code(code)
            .ok_or_else(|| TectonicsError::Format(format!("invalid orogeny code {code}")))?;
        records.points.push(PointData {
            elevation,
            thickness,
            plate,
            age,
            orogeny,
        });
        records.neighbors.push(read_index_list(r, count, "vertex neighbors")?);
        records.incident.push(read_index_list(r, usize::MAX, "vertex triangles")?);
    }
    Ok(records)
}

fn write_triangles<W: Write>(w: &mut BinaryWriter<W>, mesh: &Mesh, noise: Option<&[Vec3]>) -> Result<()> {
    w.write_count(mesh.triangle_count())?;
    for (t, tri) in mesh.triangles.iter().enumerate() {
        tri.vertices.iter().try_for_each(|&v| w.write_count(v))?;
        tri.neighbors.iter().try_for_each(|&n| w.write_optional_index(n))?;
        if let Some(noise) = noise {
            write_vec3(w, noise[t])?;
        }
    }
    Ok(())
}

fn read_triangles<R: Read>(
    r: &mut BinaryReader<R>,
    vertex_count: usize,
    with_noise: bool,
) -> Result<(Vec<Triangle>, Vec<Vec3>)> {
    let count = r.read_count("triangle count")?;
    let mut triangles = Vec::with_capacity(reserve_for(count));
    let mut noise = Vec::new();
    for _ in 0..count {
        let mut vertices = [0; 3];
        for slot in &mut vertices {
            *slot = r.read_index(vertex_count, "triangle vertex")?;
        }
        let mut neighbors = [None; 3];
        for slot in &mut neighbors {
            *slot = r.read_optional_index(count, "triangle neighbor")?;
        }
        triangles.push(Triangle { vertices, neighbors });
        if with_noise {
            noise.push(read_vec3(r, "triangle noise")?);
        }
    }
    Ok((triangles, noise))
}

/// Builds a layer from saved records, keeping the saved incident-triangle lists.
fn rebuild_layer(records: VertexRecords, triangles: Vec<Triangle>) -> Result<Layer> {
    let triangle_count = triangles.len();
    if records.incident.iter().flatten().any(|&t| t >= triangle_count) {
        return Err(TectonicsError::Format(format!(
            "incident triangle index out of range 0..{triangle_count}"
        )));
    }
    let mesh = Mesh::with_incidence(records.positions, triangles, records.neighbors, records.incident);
    Ok(Layer {
        mesh,
        points: records.points,
    })
}

pub fn save_planet<W: Write>(planet: &TectonicPlanet, writer: W) -> Result<()> {
    let mut w = BinaryWriter::new(writer);
    let crust = planet.crust();

    w.write_bool(crust.is_some())?;
    w.write_f32(planet.radius())?;
    w.write_count(planet.total_steps() as usize)?;
    w.write_count(planet.steps_since_resample() as usize)?;

    let state = planet.rng().state();
    w.write_count(state.words.len())?;
    state.words.iter().try_for_each(|&word| w.write_u32(word))?;
    w.write_count(state.index)?;

    write_layer_vertices(&mut w, planet.data())?;
    if let Some(crust) = crust {
        write_layer_vertices(&mut w, crust)?;
    }
    write_triangles(&mut w, &planet.data().mesh, Some(planet.triangle_noise()))?;

    if crust.is_some() {
        w.write_count(planet.plates().len())?;
        for plate in planet.plates() {
            write_vec3(&mut w, plate.rotation_axis)?;
            w.write_f32(plate.angular_speed)?;
            plate.transform.to_array().iter().try_for_each(|&c| w.write_f32(c))?;
            write_vec3(&mut w, plate.centroid)?;
        }
    }

    w.write_bool(planet.render().is_some())?;
    if let Some(render) = planet.render() {
        write_layer_vertices(&mut w, render)?;
        write_triangles(&mut w, &render.mesh, None)?;
    }
    w.flush()
}

/// Reads a planet written by [`save_planet`]. The configuration is not part of the file.
pub fn load_planet<R: Read>(reader: R, config: TectonicsConfig) -> Result<TectonicPlanet> {
    let mut r = BinaryReader::new(reader);

    let tectonics = r.read_bool("tectonics flag")?;
    let radius = r.read_f32("radius")?;
    let total_steps = r.read_count("total steps")? as u32;
    let steps_since_resample = r.read_count("steps since resample")? as u32;

    let word_count = r.read_count("engine word count")?;
    let words = (0..word_count)
        .map(|_| r.read_u32("engine state"))
        .collect::<Result<Vec<_>>>()?;
    let index = r.read_count("engine index")?;
    let rng = RandomEngine::from_state(&EngineState { words, index })
        .ok_or_else(|| TectonicsError::Format(format!("invalid engine state ({word_count} words, index {index})")))?;

    let data_records = read_layer_vertices(&mut r)?;
    let crust_records = if tectonics {
        Some(read_layer_vertices(&mut r)?)
    } else {
        None
    };
    let vertex_count = data_records.positions.len();
    let (triangles, noise) = read_triangles(&mut r, vertex_count, true)?;

    let mut plates = Vec::new();
    if tectonics {
        let count = r.read_count("plate count")?;
        for _ in 0..count {
            let axis = read_vec3(&mut r, "plate axis")?;
            let speed = r.read_f32("plate speed")?;
            let mut q = [0.0; 4];
            for c in &mut q {
                *c = r.read_f32("plate transform")?;
            }
            let centroid = read_vec3(&mut r, "plate centroid")?;
            let mut plate = Plate::new(axis, speed, centroid);
            plate.transform = Quat::from_array(q);
            plates.push(plate);
        }
    }

    let render = if r.read_bool("render flag")? {
        let records = read_layer_vertices(&mut r)?;
        let count = records.positions.len();
        let (render_triangles, _) = read_triangles(&mut r, count, false)?;
        Some(rebuild_layer(records, render_triangles)?)
    } else {
        None
    };

    let data = rebuild_layer(data_records, triangles.clone())?;
    let crust = match crust_records {
        Some(records) if records.positions.len() != vertex_count => {
            return Err(TectonicsError::Format(format!(
                "crust has {} vertices, data has {vertex_count}",
                records.positions.len()
            )));
        }
        Some(records) => Some(rebuild_layer(records, triangles)?),
        None => None,
    };

    let plate_count = plates.len();
    let layers = [Some(&data), crust.as_ref(), render.as_ref()];
    if let Some(bad) = layers
        .iter()
        .flatten()
        .flat_map(|layer| layer.points.iter())
        .find_map(|p| p.plate.filter(|&id| id >= plate_count))
    {
        return Err(TectonicsError::Format(format!("plate id {bad} with {plate_count} plates")));
    }

    let mut planet = TectonicPlanet::assemble(data, config, rng, noise)?;
    planet.radius = radius;
    planet.total_steps = total_steps;
    planet.steps_since_resample = steps_since_resample;
    planet.render = render;
    if let Some(crust) = crust {
        planet.crust = Some(crust);
        planet.plates = plates;
        planet.rebuild_plates();
    }
    Ok(planet)
}

impl TectonicPlanet {
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        save_planet(self, BufWriter::new(File::create(path)?))?;
        info!("Saved planet to {} after {} steps", path.display(), self.total_steps);
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>, config: TectonicsConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).inspect_err(|e| error!("Cannot open save {}: {e}", path.display()))?;
        let planet = load_planet(BufReader::new(file), config)?;
        info!(
            "Loaded planet from {}: {} plates, {} steps",
            path.display(),
            planet.plates.len(),
            planet.total_steps
        );
        Ok(planet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::icosphere;
    use std::io::Cursor;

    fn bytes_of(planet: &TectonicPlanet) -> Vec<u8> {
        let mut bytes = Vec::new();
        save_planet(planet, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn bare_planet_round_trips() {
        let planet = TectonicPlanet::new(icosphere(1), TectonicsConfig::default(), 4).unwrap();
        let loaded = load_planet(Cursor::new(bytes_of(&planet)), TectonicsConfig::default()).unwrap();
        assert!(!loaded.is_initialized());
        assert_eq!(loaded.data(), planet.data());
        assert_eq!(loaded.triangle_noise(), planet.triangle_noise());
        assert_eq!(loaded.rng(), planet.rng());
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut planet = TectonicPlanet::new(icosphere(1), TectonicsConfig::default(), 4).unwrap();
        planet.initialize_random_crust();
        let bytes = bytes_of(&planet);
        for cut in [0, 3, 40, bytes.len() / 2, bytes.len() - 1] {
            let result = load_planet(Cursor::new(&bytes[..cut]), TectonicsConfig::default());
            assert!(matches!(result, Err(TectonicsError::Truncated { .. })), "cut at {cut}");
        }
    }

    #[test]
    fn plate_ids_beyond_the_plate_list_are_rejected() {
        let mut planet = TectonicPlanet::new(icosphere(1), TectonicsConfig::default(), 4).unwrap();
        planet.data.points[0].plate = Some(3);
        let result = load_planet(Cursor::new(bytes_of(&planet)), TectonicsConfig::default());
        assert!(matches!(result, Err(TectonicsError::Format(_))));
    }

    #[test]
    fn oversized_vertex_count_reads_until_the_data_ends() {
        let planet = TectonicPlanet::new(icosphere(1), TectonicsConfig::default(), 4).unwrap();
        let mut bytes = bytes_of(&planet);
        let words = planet.rng().state().words.len();
        let offset = 4 * (5 + words + 1);
        bytes[offset..offset + 4].copy_from_slice(&i32::MAX.to_le_bytes());

        let result = load_planet(Cursor::new(&bytes[..offset + 4]), TectonicsConfig::default());
        assert!(matches!(result, Err(TectonicsError::Truncated { .. })));
        let result = load_planet(Cursor::new(bytes), TectonicsConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TectonicPlanet::load_from_file(dir.path().join("none.bin"), TectonicsConfig::default());
        assert!(matches!(result, Err(TectonicsError::Io(_))));
    }
}
