/// ## Ordered list of 3D vertices

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexList {
    vertices: Vec<[f64; 3]>,
}

impl VertexList {
    pub fn new() -> VertexList {
        VertexList::default()
    }

    pub fn push(&mut self, v: [f64; 3]) {
        self.vertices.push(v);
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// One-based access.
    pub fn get(&self, idx: usize) -> Option<[f64; 3]> {
        if idx == 0 {
            return None;
        }
        self.vertices.get(idx - 1).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, [f64; 3]> {
        self.vertices.iter()
    }

    pub fn translate(&self, by: [f64; 3]) -> VertexList {
        VertexList {
            vertices: self
                .vertices
                .iter()
                .map(|v| [v[0] + by[0], v[1] + by[1], v[2] + by[2]])
                .collect(),
        }
    }

    pub fn scale(&self, s: f64) -> VertexList {
        VertexList {
            vertices: self
                .vertices
                .iter()
                .map(|v| [v[0] * s, v[1] * s, v[2] * s])
                .collect(),
        }
    }
}

impl std::fmt::Display for VertexList {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "VertexList({})", self.vertices.len())
    }
}
