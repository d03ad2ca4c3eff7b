//! CPU-side model geometry and file import.
//!
//! # Supported Formats
//!
//! | Format | Extensions     | Notes |
//! |--------|----------------|-------|
//! | glTF   | `.gltf`, `.glb`| Triangle primitives, materials, embedded images |
//! | STL    | `.stl`         | Binary and ASCII, no UV coordinates, one white material |
//!
//! Loading runs on a worker thread, so nothing here touches the GPU except
//! [`RawGeometry::upload`].

use std::path::Path;

use glam::{Mat4, Vec3};

use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::material::MaterialDesc;
use crate::mesh::{Mesh, Vertex3d, normal_matrix};
use crate::texture::ImageData;

/// Raw geometry data before GPU upload.
///
/// Node matrices are baked in here before the GPU mesh is created.
#[derive(Clone, Debug)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Bake an affine transform into positions and normals.
    pub fn transform(&mut self, matrix: Mat4) {
        if matrix == Mat4::IDENTITY {
            return;
        }
        let normals = normal_matrix(matrix);
        for v in &mut self.vertices {
            v.position = matrix.transform_point3(Vec3::from(v.position)).into();
            v.normal = normals
                .transform_vector3(Vec3::from(v.normal))
                .normalize_or_zero()
                .into();
        }
    }

    /// Smooth normals from area-weighted face normals.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0 >= self.vertices.len() || i1 >= self.vertices.len() || i2 >= self.vertices.len()
            {
                continue;
            }

            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            let face_normal = (p1 - p0).cross(p2 - p0);

            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face_normal;
                self.vertices[i].normal = n.into();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }

    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

/// One drawable piece of an imported model, already in model space.
#[derive(Clone, Debug)]
pub struct ModelPrimitive {
    pub name: String,
    pub geometry: RawGeometry,
    pub material: MaterialDesc,
}

/// Everything decoded from a model file.
///
/// Material texture slots index into `images`.
#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub primitives: Vec<ModelPrimitive>,
    pub images: Vec<ImageData>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.geometry.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives
            .iter()
            .map(|p| p.geometry.indices.len() / 3)
            .sum()
    }
}

/// Load a model, picking the importer from the file extension.
pub fn load_model(path: &Path) -> Result<ModelData> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "gltf" | "glb" => load_gltf(path),
        "stl" => {
            let file = std::fs::File::open(path)?;
            let mut reader = std::io::BufReader::new(file);
            let geometry = parse_stl(&mut reader)?;
            Ok(ModelData {
                primitives: vec![ModelPrimitive {
                    name: display_name(path),
                    geometry,
                    material: MaterialDesc::default(),
                }],
                images: Vec::new(),
            })
        }
        _ => Err(Error::UnknownFormat(ext)),
    }
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string()
}

fn parse_stl<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<RawGeometry> {
    let stl = stl_io::read_stl(reader).map_err(|e| Error::Stl(e.to_string()))?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    let mut indices = Vec::with_capacity(stl.faces.len() * 3);

    // Flat shading: every face gets its own three vertices.
    for (i, face) in stl.faces.iter().enumerate() {
        let normal: [f32; 3] = face.normal.into();
        for &vertex_idx in &face.vertices {
            let position: [f32; 3] = stl
                .vertices
                .get(vertex_idx)
                .copied()
                .ok_or_else(|| Error::Stl(format!("face {i} references vertex {vertex_idx}")))?
                .into();
            vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
        }

        let base = (i * 3) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    Ok(RawGeometry::new(vertices, indices))
}

fn load_gltf(path: &Path) -> Result<ModelData> {
    let (document, buffers, images) = gltf::import(path)?;

    let mut primitives = Vec::new();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            collect_node(&node, Mat4::IDENTITY, &buffers, &mut primitives);
        }
    }

    let images = images.iter().map(gltf_image_to_rgba).collect();
    Ok(ModelData { primitives, images })
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ModelPrimitive>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh.name().unwrap_or("mesh");
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "skipping {mesh_name} primitive {}: {:?} mode is not supported",
                    primitive.index(),
                    primitive.mode()
                );
                continue;
            }
            if let Some(mut geometry) = read_primitive(&primitive, buffers) {
                geometry.transform(world);
                out.push(ModelPrimitive {
                    name: format!("{mesh_name}#{}", primitive.index()),
                    geometry,
                    material: MaterialDesc::from_gltf(&primitive.material()),
                });
            }
        }
    }

    for child in node.children() {
        collect_node(&child, world, buffers, out);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Option<RawGeometry> {
    let reader = primitive.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|t| t.into_f32().collect());

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or([0.0, 1.0, 0.0]);
            let uv = uvs
                .as_ref()
                .and_then(|t| t.get(i).copied())
                .unwrap_or([0.0, 0.0]);
            Vertex3d::new(position, normal, uv)
        })
        .collect();

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let mut geometry = RawGeometry::new(vertices, indices);
    if normals.is_none() {
        geometry.recalculate_normals();
    }
    Some(geometry)
}

/// Expand any glTF pixel layout to RGBA8.
fn gltf_image_to_rgba(image: &gltf::image::Data) -> ImageData {
    use gltf::image::Format;

    let px = &image.pixels;
    let rgba = match image.format {
        Format::R8G8B8A8 => px.clone(),
        Format::R8G8B8 => px
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        Format::R8G8 => px
            .chunks_exact(2)
            .flat_map(|c| [c[0], c[1], 0, 255])
            .collect(),
        Format::R8 => px.iter().flat_map(|&r| [r, r, r, 255]).collect(),
        // 16-bit channels are little-endian; keep the high byte.
        Format::R16 => px.chunks_exact(2).flat_map(|c| [c[1], c[1], c[1], 255]).collect(),
        Format::R16G16 => px
            .chunks_exact(4)
            .flat_map(|c| [c[1], c[3], 0, 255])
            .collect(),
        Format::R16G16B16 => px
            .chunks_exact(6)
            .flat_map(|c| [c[1], c[3], c[5], 255])
            .collect(),
        Format::R16G16B16A16 => px
            .chunks_exact(8)
            .flat_map(|c| [c[1], c[3], c[5], c[7]])
            .collect(),
        Format::R32G32B32FLOAT => px
            .chunks_exact(12)
            .flat_map(|c| {
                let [r, g, b] = [&c[0..4], &c[4..8], &c[8..12]].map(unit_float_to_u8);
                [r, g, b, 255]
            })
            .collect(),
        Format::R32G32B32A32FLOAT => px
            .chunks_exact(16)
            .flat_map(|c| [&c[0..4], &c[4..8], &c[8..12], &c[12..16]].map(unit_float_to_u8))
            .collect(),
    };

    ImageData {
        width: image.width,
        height: image.height,
        rgba,
    }
}

fn unit_float_to_u8(bytes: &[u8]) -> u8 {
    let v = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recalculated_normals_face_the_winding() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([1.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([0.0, 1.0, 0.0], [0.0; 3], [0.0, 0.0]),
        ];
        let mut geom = RawGeometry::new(vertices, vec![0, 1, 2]);
        geom.recalculate_normals();

        for v in &geom.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn transform_bakes_node_matrix() {
        let vertices = vec![Vertex3d::new([1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0])];
        let mut geom = RawGeometry::new(vertices, vec![]);
        geom.transform(
            Mat4::from_translation(Vec3::Y) * Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );

        let p = Vec3::from(geom.vertices[0].position);
        let n = Vec3::from(geom.vertices[0].normal);
        assert!(p.distance(Vec3::new(0.0, 2.0, 0.0)) < 1e-5);
        assert!(n.distance(Vec3::Y) < 1e-5);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_model(Path::new("helmet.fbx")).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat(ext) if ext == "fbx"));
    }

    #[test]
    fn ascii_stl_parses_one_triangle() {
        let src = b"solid t\n\
            facet normal 0 0 1\n\
            outer loop\n\
            vertex 0 0 0\n\
            vertex 1 0 0\n\
            vertex 0 1 0\n\
            endloop\n\
            endfacet\n\
            endsolid t\n";
        let geom = parse_stl(&mut std::io::Cursor::new(&src[..])).unwrap();
        assert_eq!(geom.vertices.len(), 3);
        assert_eq!(geom.indices, vec![0, 1, 2]);
        assert_eq!(geom.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn rgb_images_gain_opaque_alpha() {
        let image = gltf::image::Data {
            pixels: vec![10, 20, 30],
            format: gltf::image::Format::R8G8B8,
            width: 1,
            height: 1,
        };
        assert_eq!(gltf_image_to_rgba(&image).rgba, vec![10, 20, 30, 255]);
    }
}
