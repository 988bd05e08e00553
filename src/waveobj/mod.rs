//! A minimal Wavefront OBJ reader: only the geometry is used.

use std::{io::BufRead, path::Path};

use anyhow::{Context, Result, anyhow};

use crate::paper;
use crate::util_3d::Vector3;

#[derive(Clone, Debug)]
pub struct Face {
    object: usize,
    verts: Vec<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct Model {
    objects: Vec<String>,
    vs: Vec<[f32; 3]>,
    faces: Vec<Face>,
}

// OBJ indices start at 1, negative ones count backwards from the last vertex
fn parse_index(text: &str, count: usize) -> Result<u32> {
    let idx: i64 = text.parse().with_context(|| format!("invalid index '{text}'"))?;
    let res = match idx {
        0 => None,
        i if i > 0 => Some(i - 1),
        i => Some(count as i64 + i),
    };
    match res {
        Some(i) if (0..count as i64).contains(&i) => Ok(i as u32),
        _ => Err(anyhow!("vertex index {idx} out of range")),
    }
}

impl Model {
    pub fn from_reader<R: BufRead>(r: R) -> Result<Model> {
        let syn_error = || anyhow!("invalid obj syntax");

        let mut data = Model::default();
        let mut current_object: usize = 0;

        for (num, line) in r.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            //skip empty and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut words = line.split_whitespace();
            let first = words.next().ok_or_else(syn_error)?;
            match first {
                "o" | "g" => {
                    // All the objects are combined into one, the numbering of vertices is global to the file
                    let name = words.next().unwrap_or_default();
                    current_object = match data.objects.iter().position(|o| o == name) {
                        Some(p) => p,
                        None => {
                            data.objects.push(String::from(name));
                            data.objects.len() - 1
                        }
                    };
                }
                "v" => {
                    let mut coord = || -> Result<f32> {
                        let w = words.next().ok_or_else(syn_error)?;
                        w.parse().with_context(|| format!("line {}: invalid coordinate '{w}'", num + 1))
                    };
                    let x = coord()?;
                    let y = coord()?;
                    let z = coord()?;
                    data.vs.push([x, y, z]);
                }
                "f" => {
                    let mut verts = Vec::new();
                    for fv in words {
                        // texture coordinates and normals are ignored
                        let v = fv.split('/').next().ok_or_else(syn_error)?;
                        let v = parse_index(v, data.vs.len()).with_context(|| format!("line {}", num + 1))?;
                        verts.push(v);
                    }
                    if verts.len() < 3 {
                        return Err(anyhow!("line {}: a face needs at least 3 vertices", num + 1));
                    }
                    data.faces.push(Face {
                        object: current_object,
                        verts,
                    });
                }
                "vt" | "vn" | "s" | "mtllib" | "usemtl" | "l" => {}
                p => {
                    log::debug!("unknown obj keyword '{p}'");
                }
            }
        }
        Ok(data)
    }

    pub fn from_path(path: &Path) -> Result<Model> {
        let f = std::fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let f = std::io::BufReader::new(f);
        Model::from_reader(f).with_context(|| format!("error reading {}", path.display()))
    }

    pub fn objects(&self) -> impl Iterator<Item = &str> + '_ {
        self.objects.iter().map(|s| &s[..])
    }
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }
    pub fn vertex_by_index(&self, idx: u32) -> &[f32; 3] {
        &self.vs[idx as usize]
    }

    /// Builds the mesh to unfold.
    pub fn to_paper(&self) -> paper::Result<paper::Model> {
        let positions = self.vs.iter().map(|&[x, y, z]| Vector3::new(x, y, z)).collect();
        let polygons: Vec<Vec<u32>> = self.faces.iter().map(|f| f.verts.clone()).collect();
        paper::Model::from_polygons(positions, &polygons)
    }
}

impl Face {
    pub fn object(&self) -> usize {
        self.object
    }
    pub fn vertices(&self) -> &[u32] {
        &self.verts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA: &str = "\
# a tetrahedron
o tetra
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
vn 0 0 -1
f 1 3 2
f 1/1/1 2/2/1 4/3/1
f 1//1 4//1 3//1
f -3 -2 -1
";

    #[test]
    fn reads_all_the_face_formats() {
        let m = Model::from_reader(TETRA.as_bytes()).unwrap();
        assert_eq!(m.objects().collect::<Vec<_>>(), ["tetra"]);
        assert_eq!(m.faces().len(), 4);
        assert_eq!(m.faces()[1].vertices(), [0, 1, 3]);
        assert_eq!(m.faces()[2].vertices(), [0, 3, 2]);
        // relative indices
        assert_eq!(m.faces()[3].vertices(), [1, 2, 3]);
        assert_eq!(m.vertex_by_index(3), &[0.0, 0.0, 1.0]);

        let model = m.to_paper().unwrap();
        assert_eq!(model.num_faces(), 4);
        assert_eq!(model.num_edges(), 6);
    }

    #[test]
    fn bad_indices_are_errors() {
        assert!(Model::from_reader("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n".as_bytes()).is_err());
        assert!(Model::from_reader("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n".as_bytes()).is_err());
        assert!(Model::from_reader("v 0 0 0\nv 1 0 0\nf 1 2\n".as_bytes()).is_err());
        assert!(Model::from_reader("v 0 zero 0\n".as_bytes()).is_err());
    }
}
