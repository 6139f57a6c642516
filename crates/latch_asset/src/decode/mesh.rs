use super::{DecodeInput, Decoder};
use crate::{AssetError, AssetPayload, Mesh};
use std::io::Cursor;

/// Decodes Wavefront OBJ text into one triangulated, single-index mesh.
///
/// Every object in the file is merged into the result. Materials are not
/// loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshDecoder;

impl Decoder for MeshDecoder {
    fn decode(&self, input: DecodeInput<'_>) -> Result<AssetPayload, AssetError> {
        let bytes = input.require_bytes()?;
        let text = std::str::from_utf8(bytes)
            .map_err(|err| input.error(format!("OBJ source is not UTF-8: {err}")))?;

        let (models, _materials) = tobj::load_obj_buf(
            &mut Cursor::new(text),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Err(tobj::LoadError::OpenFileFailed),
        )
        .map_err(|err| input.error(format!("unreadable OBJ: {err}")))?;

        let mut mesh = Mesh::default();
        let mut has_normals = true;
        let mut has_texcoords = true;
        for model in &models {
            let source = &model.mesh;
            let base = u32::try_from(mesh.positions.len())
                .map_err(|_| input.error("mesh has too many vertices"))?;
            let vertices = source.positions.len() / 3;

            mesh.positions
                .extend(source.positions.chunks_exact(3).map(|v| [v[0], v[1], v[2]]));
            if source.normals.len() / 3 == vertices {
                mesh.normals
                    .extend(source.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]));
            } else {
                has_normals = false;
            }
            if source.texcoords.len() / 2 == vertices {
                mesh.texcoords
                    .extend(source.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]));
            } else {
                has_texcoords = false;
            }
            mesh.indices
                .extend(source.indices.iter().map(|index| base + index));
        }

        if mesh.positions.is_empty() || mesh.indices.is_empty() {
            return Err(input.error("OBJ source contains no geometry"));
        }
        if !has_normals {
            mesh.normals.clear();
        }
        if !has_texcoords {
            mesh.texcoords.clear();
        }
        Ok(AssetPayload::Mesh(mesh))
    }
}
