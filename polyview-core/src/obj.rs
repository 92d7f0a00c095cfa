/// Wavefront OBJ import and export
///
/// Only geometry is read: `v` records and the vertex index of each `f`
/// reference (`i`, `i/t`, `i/t/n`, `i//n`). Everything else is skipped.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::take_while,
    character::complete::{char, i64 as index, space0, space1},
    combinator::{all_consuming, opt},
    number::complete::double,
    sequence::preceded,
    IResult,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::color::Rgb;
use crate::geometry::{Face, Polyhedron};

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to access OBJ file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: malformed vertex record {text:?}")]
    BadVertex { line: usize, text: String },
    #[error("model contains no usable faces")]
    NoFaces,
}

/// Import switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjOptions {
    /// Mirror Y (for Y-down exporters) and reverse each face's winding so
    /// normals stay outward.
    pub flip_y: bool,
}

/// Color by dominant normal direction, for models without materials.
pub fn face_color(normal: &Vector3<f64>) -> Rgb {
    if normal.y.abs() > 0.7 {
        if normal.y > 0.0 {
            Rgb::new(255, 50, 50)
        } else {
            Rgb::new(50, 255, 255)
        }
    } else if normal.x.abs() > 0.7 {
        if normal.x > 0.0 {
            Rgb::new(50, 255, 50)
        } else {
            Rgb::new(50, 50, 255)
        }
    } else if normal.z.abs() > 0.7 {
        if normal.z > 0.0 {
            Rgb::new(255, 255, 50)
        } else {
            Rgb::new(255, 50, 255)
        }
    } else {
        let v = (128.0 + normal.y * 64.0) as u8;
        Rgb::new(v, v, v)
    }
}

fn vertex_record(input: &str) -> IResult<&str, Point3<f64>> {
    let (input, x) = preceded(space0, double)(input)?;
    let (input, y) = preceded(space1, double)(input)?;
    let (input, z) = preceded(space1, double)(input)?;
    // Optional w weight
    let (input, _) = opt(preceded(space1, double))(input)?;
    let (input, _) = space0(input)?;
    Ok((input, Point3::new(x, y, z)))
}

/// One `f` token; texture and normal references are consumed and ignored.
fn face_reference(input: &str) -> IResult<&str, i64> {
    let (input, idx) = index(input)?;
    let (input, _) = opt(preceded(
        char('/'),
        take_while(|c: char| c == '/' || c == '-' || c.is_ascii_digit()),
    ))(input)?;
    Ok((input, idx))
}

/// Parse OBJ text into a polyhedron.
///
/// Face references that are non-numeric, non-positive or out of range are
/// dropped one by one; faces left with fewer than three points are dropped.
/// A `v` record that is not three numbers fails the whole load.
pub fn parse_obj(input: &str, options: ObjOptions) -> Result<Polyhedron, ObjError> {
    let mut vertices = Vec::new();
    let mut face_lines = Vec::new();

    for (n, raw) in input.lines().enumerate() {
        let line_no = n + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match keyword {
            "v" => match all_consuming(vertex_record)(rest) {
                Ok((_, p)) => {
                    let p = if options.flip_y { Point3::new(p.x, -p.y, p.z) } else { p };
                    vertices.push(p);
                }
                Err(_) => {
                    return Err(ObjError::BadVertex {
                        line: line_no,
                        text: line.to_string(),
                    })
                }
            },
            "f" => face_lines.push((line_no, rest)),
            _ => {}
        }
    }

    let mut faces = Vec::with_capacity(face_lines.len());
    for (line_no, rest) in face_lines {
        let mut points = Vec::new();
        for token in rest.split_whitespace() {
            match all_consuming(face_reference)(token) {
                Ok((_, i)) if i >= 1 && (i as usize) <= vertices.len() => {
                    points.push(vertices[i as usize - 1]);
                }
                _ => warn!(line = line_no, token, "discarding bad face reference"),
            }
        }
        if points.len() < 3 {
            warn!(line = line_no, points = points.len(), "discarding face with fewer than 3 points");
            continue;
        }
        if options.flip_y {
            points.reverse();
        }
        let mut face = Face::new(points, Rgb::WHITE);
        face.color = face_color(&face.normal());
        faces.push(face);
    }

    if faces.is_empty() {
        return Err(ObjError::NoFaces);
    }
    debug!(vertices = vertices.len(), faces = faces.len(), "parsed OBJ");
    Ok(Polyhedron::new(faces))
}

pub fn load_obj(path: impl AsRef<Path>, options: ObjOptions) -> Result<Polyhedron, ObjError> {
    let text = std::fs::read_to_string(path)?;
    parse_obj(&text, options)
}

fn vertex_key(p: &Point3<f64>) -> String {
    format!("{:.6} {:.6} {:.6}", p.x + 0.0, p.y + 0.0, p.z + 0.0)
}

/// Write faces as OBJ: unique vertices (compared at six decimals) followed
/// by 1-based face records.
pub fn write_obj<W: Write>(mut writer: W, faces: &[Face]) -> Result<(), ObjError> {
    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();
    let face_indices: Vec<Vec<usize>> = faces
        .iter()
        .map(|face| {
            face.points
                .iter()
                .map(|p| {
                    let key = vertex_key(p);
                    *index_of.entry(key.clone()).or_insert_with(|| {
                        order.push(key);
                        order.len()
                    })
                })
                .collect()
        })
        .collect();

    writeln!(writer, "# polyview export")?;
    for key in &order {
        writeln!(writer, "v {key}")?;
    }
    for indices in &face_indices {
        write!(writer, "f")?;
        for i in indices {
            write!(writer, " {i}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Save a polyhedron's current world-space faces.
pub fn save_obj(path: impl AsRef<Path>, poly: &Polyhedron) -> Result<(), ObjError> {
    let file = File::create(path)?;
    write_obj(BufWriter::new(file), &poly.transformed_faces())
}
