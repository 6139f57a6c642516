use super::{DecodeInput, Decoder};
use crate::{AssetError, AssetPayload, ShaderProgram, ShaderStage, ShaderStageKind};

const TYPE_MARKER: &str = "#type";

/// Decodes one shader stage from UTF-8 source text.
#[derive(Debug, Clone, Copy)]
pub struct ShaderStageDecoder {
    stage: ShaderStageKind,
}

impl ShaderStageDecoder {
    pub fn vertex() -> Self {
        Self {
            stage: ShaderStageKind::Vertex,
        }
    }

    pub fn fragment() -> Self {
        Self {
            stage: ShaderStageKind::Fragment,
        }
    }
}

impl Decoder for ShaderStageDecoder {
    fn decode(&self, input: DecodeInput<'_>) -> Result<AssetPayload, AssetError> {
        let source = utf8_source(&input)?;
        if source.trim().is_empty() {
            return Err(input.error(format!("{} shader source is empty", self.stage.as_str())));
        }
        Ok(AssetPayload::Shader(ShaderStage {
            stage: self.stage,
            source: source.to_string(),
            gpu: None,
        }))
    }
}

/// Builds a vertex/fragment program.
///
/// With a byte source the file is split on `#type vertex` / `#type fragment`
/// (`pixel` is accepted for fragment) markers. Without one, the program is
/// composed from its dependencies, which must be exactly one vertex and one
/// fragment stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderProgramDecoder;

impl Decoder for ShaderProgramDecoder {
    fn decode(&self, input: DecodeInput<'_>) -> Result<AssetPayload, AssetError> {
        if input.bytes.is_some() {
            let source = utf8_source(&input)?;
            let (vertex_source, fragment_source) =
                split_shader_source(source).map_err(|message| input.error(message))?;
            return Ok(AssetPayload::ShaderProgram(ShaderProgram {
                vertex_source,
                fragment_source,
                gpu: None,
            }));
        }

        let mut vertex = None;
        let mut fragment = None;
        for payload in input.dependencies {
            let Some(shader) = payload.as_shader() else {
                return Err(input.error("dependency is not a shader stage"));
            };
            let slot = match shader.stage {
                ShaderStageKind::Vertex => &mut vertex,
                ShaderStageKind::Fragment => &mut fragment,
            };
            if slot.replace(shader.source.clone()).is_some() {
                return Err(input.error(format!(
                    "more than one {} stage given",
                    shader.stage.as_str()
                )));
            }
        }

        match (vertex, fragment) {
            (Some(vertex_source), Some(fragment_source)) => {
                Ok(AssetPayload::ShaderProgram(ShaderProgram {
                    vertex_source,
                    fragment_source,
                    gpu: None,
                }))
            }
            _ => Err(input.error("one or more shader stages are missing")),
        }
    }
}

/// Split a combined shader file into `(vertex, fragment)` sources.
pub fn split_shader_source(source: &str) -> Result<(String, String), String> {
    let mut vertex = String::new();
    let mut fragment = String::new();

    let mut cursor = source.find(TYPE_MARKER);
    while let Some(pos) = cursor {
        let line_end = source[pos..]
            .find(['\r', '\n'])
            .map(|offset| pos + offset)
            .ok_or("shader syntax error: '#type' marker is not followed by a line end")?;

        let stage = source[pos + TYPE_MARKER.len()..line_end].trim();
        if !matches!(stage, "vertex" | "fragment" | "pixel") {
            return Err(format!("shader syntax error: unknown stage '{stage}'"));
        }

        let body_start = source[line_end..]
            .find(|c: char| c != '\r' && c != '\n')
            .map(|offset| line_end + offset)
            .ok_or_else(|| format!("shader syntax error: '{stage}' section has no body"))?;

        cursor = source[body_start..]
            .find(TYPE_MARKER)
            .map(|offset| body_start + offset);
        let body = &source[body_start..cursor.unwrap_or(source.len())];

        if stage == "vertex" {
            vertex = body.to_string();
        } else {
            fragment = body.to_string();
        }
    }

    if vertex.is_empty() || fragment.is_empty() {
        return Err("one or more shader stages are missing".to_string());
    }
    Ok((vertex, fragment))
}

fn utf8_source<'a>(input: &DecodeInput<'a>) -> Result<&'a str, AssetError> {
    let bytes = input.require_bytes()?;
    std::str::from_utf8(bytes).map_err(|err| input.error(format!("source is not UTF-8: {err}")))
}
