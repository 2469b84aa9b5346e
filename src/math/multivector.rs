//! Multivectors over a small set of diagonal-metric geometric algebras.
//!
//! Components are stored by basis-blade bitmask: bit `i` set means basis
//! vector `i` is a factor of the blade. Two multivectors can only be
//! combined when they belong to the same `Algebra`.

/// Identity of the underlying algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algebra {
    /// Euclidean 3D.
    E3,
    /// Projective 3D (homogeneous coordinates).
    P3,
    /// Conformal 3D, diagonal basis `e1 e2 e3 ep em`.
    N3,
}

const E3_SIGNATURE: [f64; 3] = [1.0, 1.0, 1.0];
const P3_SIGNATURE: [f64; 4] = [1.0, 1.0, 1.0, 1.0];
const N3_SIGNATURE: [f64; 5] = [1.0, 1.0, 1.0, 1.0, -1.0];

impl Algebra {
    pub fn dim(self) -> usize {
        self.signature().len()
    }

    /// Number of basis blades.
    pub fn ga_dim(self) -> usize {
        1 << self.dim()
    }

    pub fn signature(self) -> &'static [f64] {
        match self {
            Algebra::E3 => &E3_SIGNATURE,
            Algebra::P3 => &P3_SIGNATURE,
            Algebra::N3 => &N3_SIGNATURE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Algebra::E3 => "E3",
            Algebra::P3 => "P3",
            Algebra::N3 => "N3",
        }
    }

    pub fn basis_name(self, i: usize) -> &'static str {
        match (self, i) {
            (_, 0) => "e1",
            (_, 1) => "e2",
            (_, 2) => "e3",
            (Algebra::P3, 3) => "e4",
            (Algebra::N3, 3) => "ep",
            _ => "em",
        }
    }

    /// Blade bitmasks ordered by grade, then lexically.
    pub fn blade_order(self) -> Vec<usize> {
        let mut blades: Vec<usize> = (0..self.ga_dim()).collect();
        blades.sort_by_key(|b| (b.count_ones(), reversed_bits(*b, self.dim())));
        blades
    }
}

fn reversed_bits(b: usize, dim: usize) -> usize {
    let mut r = 0;
    for i in 0..dim {
        if b & (1 << i) != 0 {
            r |= 1 << (dim - 1 - i);
        }
    }
    usize::MAX - r
}

fn grade_of(blade: usize) -> u32 {
    blade.count_ones()
}

/// Sign from reordering the product of two basis blades into canonical order.
fn reorder_sign(a: usize, b: usize) -> f64 {
    let mut a = a >> 1;
    let mut swaps = 0;
    while a != 0 {
        swaps += (a & b).count_ones();
        a >>= 1;
    }
    if swaps % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

fn blade_product(algebra: Algebra, a: usize, b: usize) -> (usize, f64) {
    let mut sign = reorder_sign(a, b);
    let common = a & b;
    for (i, s) in algebra.signature().iter().enumerate() {
        if common & (1 << i) != 0 {
            sign *= s;
        }
    }
    (a ^ b, sign)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiVector {
    algebra: Algebra,
    comps: Vec<f64>,
}

impl MultiVector {
    pub fn zero(algebra: Algebra) -> MultiVector {
        MultiVector {
            algebra,
            comps: vec![0.0; algebra.ga_dim()],
        }
    }

    pub fn scalar(algebra: Algebra, val: f64) -> MultiVector {
        let mut mv = MultiVector::zero(algebra);
        mv.comps[0] = val;
        mv
    }

    /// Basis vector `i` (zero-based).
    pub fn basis(algebra: Algebra, i: usize) -> MultiVector {
        let mut mv = MultiVector::zero(algebra);
        if i < algebra.dim() {
            mv.comps[1 << i] = 1.0;
        }
        mv
    }

    pub fn vector(algebra: Algebra, coords: &[f64]) -> MultiVector {
        let mut mv = MultiVector::zero(algebra);
        for (i, c) in coords.iter().enumerate().take(algebra.dim()) {
            mv.comps[1 << i] = *c;
        }
        mv
    }

    pub fn pseudoscalar(algebra: Algebra) -> MultiVector {
        let mut mv = MultiVector::zero(algebra);
        let top = algebra.ga_dim() - 1;
        mv.comps[top] = 1.0;
        mv
    }

    pub fn algebra(&self) -> Algebra {
        self.algebra
    }

    pub fn scalar_part(&self) -> f64 {
        self.comps[0]
    }

    /// Component by one-based index in canonical blade order.
    pub fn component_index(&self, idx: usize) -> Option<usize> {
        if idx == 0 {
            return None;
        }
        self.algebra.blade_order().get(idx - 1).copied()
    }

    pub fn get(&self, blade: usize) -> f64 {
        self.comps[blade]
    }

    pub fn set(&mut self, blade: usize, val: f64) {
        self.comps[blade] = val;
    }

    pub fn components(&self) -> &[f64] {
        &self.comps
    }

    /// Grades present with a component magnitude above `precision`.
    pub fn grades(&self, precision: f64) -> Vec<u32> {
        let mut grades: Vec<u32> = self
            .comps
            .iter()
            .enumerate()
            .filter(|(_, v)| v.abs() > precision)
            .map(|(b, _)| grade_of(b))
            .collect();
        grades.sort_unstable();
        grades.dedup();
        grades
    }

    pub fn grade(&self, k: u32) -> MultiVector {
        let mut mv = MultiVector::zero(self.algebra);
        for (b, v) in self.comps.iter().enumerate() {
            if grade_of(b) == k {
                mv.comps[b] = *v;
            }
        }
        mv
    }

    pub fn same_algebra(&self, other: &MultiVector) -> bool {
        self.algebra == other.algebra
    }

    fn zip<F: Fn(f64, f64) -> f64>(&self, other: &MultiVector, f: F) -> Option<MultiVector> {
        if !self.same_algebra(other) {
            return None;
        }
        Some(MultiVector {
            algebra: self.algebra,
            comps: self
                .comps
                .iter()
                .zip(other.comps.iter())
                .map(|(a, b)| f(*a, *b))
                .collect(),
        })
    }

    pub fn add(&self, other: &MultiVector) -> Option<MultiVector> {
        self.zip(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &MultiVector) -> Option<MultiVector> {
        self.zip(other, |a, b| a - b)
    }

    pub fn scale(&self, s: f64) -> MultiVector {
        MultiVector {
            algebra: self.algebra,
            comps: self.comps.iter().map(|v| v * s).collect(),
        }
    }

    pub fn add_scalar(&self, s: f64) -> MultiVector {
        let mut mv = self.clone();
        mv.comps[0] += s;
        mv
    }

    fn product_by<F: Fn(usize, usize) -> bool>(
        &self,
        other: &MultiVector,
        keep: F,
    ) -> Option<MultiVector> {
        if !self.same_algebra(other) {
            return None;
        }
        let mut res = MultiVector::zero(self.algebra);
        for (a, va) in self.comps.iter().enumerate() {
            if *va == 0.0 {
                continue;
            }
            for (b, vb) in other.comps.iter().enumerate() {
                if *vb == 0.0 || !keep(a, b) {
                    continue;
                }
                let (blade, sign) = blade_product(self.algebra, a, b);
                res.comps[blade] += sign * va * vb;
            }
        }
        Some(res)
    }

    /// Geometric product.
    pub fn gp(&self, other: &MultiVector) -> Option<MultiVector> {
        self.product_by(other, |_, _| true)
    }

    /// Outer product.
    pub fn op(&self, other: &MultiVector) -> Option<MultiVector> {
        self.product_by(other, |a, b| a & b == 0)
    }

    /// Inner product: the grade |r - s| part of each pair of blades.
    pub fn ip(&self, other: &MultiVector) -> Option<MultiVector> {
        let algebra = self.algebra;
        self.product_by(other, move |a, b| {
            let (blade, _) = blade_product(algebra, a, b);
            let (ga, gb) = (grade_of(a) as i64, grade_of(b) as i64);
            grade_of(blade) as i64 == (ga - gb).abs()
        })
    }

    pub fn reverse(&self) -> MultiVector {
        let mut mv = self.clone();
        for (b, v) in mv.comps.iter_mut().enumerate() {
            let k = grade_of(b);
            if (k * k.saturating_sub(1) / 2) % 2 == 1 {
                *v = -*v;
            }
        }
        mv
    }

    pub fn involute(&self) -> MultiVector {
        let mut mv = self.clone();
        for (b, v) in mv.comps.iter_mut().enumerate() {
            if grade_of(b) % 2 == 1 {
                *v = -*v;
            }
        }
        mv
    }

    /// Versor inverse `~A / (A ~A)`; `None` if `A ~A` is not a non-zero scalar.
    pub fn inverse(&self, sensitivity: f64) -> Option<MultiVector> {
        let rev = self.reverse();
        let norm = self.gp(&rev)?;
        let g = norm.grades(sensitivity);
        if !(g.is_empty() || g == [0]) {
            return None;
        }
        let n = norm.scalar_part();
        if n.abs() <= sensitivity {
            return None;
        }
        Some(rev.scale(1.0 / n))
    }

    pub fn dual(&self, sensitivity: f64) -> Option<MultiVector> {
        let i = MultiVector::pseudoscalar(self.algebra).inverse(sensitivity)?;
        self.gp(&i)
    }

    /// Regressive product through the dual.
    pub fn meet(&self, other: &MultiVector, sensitivity: f64) -> Option<MultiVector> {
        let a = self.dual(sensitivity)?;
        let b = other.dual(sensitivity)?;
        let i = MultiVector::pseudoscalar(self.algebra);
        a.op(&b)?.gp(&i)
    }

    pub fn join(&self, other: &MultiVector) -> Option<MultiVector> {
        self.op(other)
    }

    pub fn strip(&mut self, sensitivity: f64) {
        for v in self.comps.iter_mut() {
            if v.abs() <= sensitivity {
                *v = 0.0;
            }
        }
    }
}

impl std::fmt::Display for MultiVector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut first = true;
        for blade in self.algebra.blade_order() {
            let v = self.comps[blade];
            if v == 0.0 {
                continue;
            }
            let mag = super::fmt_scalar(v.abs());
            if first {
                if v < 0.0 {
                    write!(f, "-")?;
                }
            } else if v < 0.0 {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            first = false;
            if blade == 0 {
                write!(f, "{}", mag)?;
                continue;
            }
            let names: Vec<&str> = (0..self.algebra.dim())
                .filter(|i| blade & (1 << i) != 0)
                .map(|i| self.algebra.basis_name(i))
                .collect();
            if mag == "1" {
                write!(f, "{}", names.join("^"))?;
            } else {
                write!(f, "{} {}", mag, names.join("^"))?;
            }
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_square_to_scalars() {
        let a = MultiVector::vector(Algebra::E3, &[1.0, 2.0, 0.0]);
        let sq = a.gp(&a).unwrap();
        assert_eq!(sq.grades(1e-12), vec![0]);
        assert_eq!(sq.scalar_part(), 5.0);
    }

    #[test]
    fn test_outer_anticommutes() {
        let e1 = MultiVector::basis(Algebra::E3, 0);
        let e2 = MultiVector::basis(Algebra::E3, 1);
        let a = e1.op(&e2).unwrap();
        let b = e2.op(&e1).unwrap();
        assert_eq!(a, b.scale(-1.0));
        assert_eq!(a.to_string(), "e1^e2");
    }

    #[test]
    fn test_mixed_algebras_rejected() {
        let a = MultiVector::basis(Algebra::E3, 0);
        let b = MultiVector::basis(Algebra::P3, 0);
        assert!(a.add(&b).is_none());
        assert!(a.gp(&b).is_none());
    }

    #[test]
    fn test_inverse() {
        let a = MultiVector::vector(Algebra::E3, &[0.0, 2.0, 0.0]);
        let inv = a.inverse(1e-12).unwrap();
        let one = a.gp(&inv).unwrap();
        assert_eq!(one, MultiVector::scalar(Algebra::E3, 1.0));
        assert!(MultiVector::zero(Algebra::E3).inverse(1e-12).is_none());
    }

    #[test]
    fn test_null_vector_in_conformal_space() {
        let ep = MultiVector::basis(Algebra::N3, 3);
        let em = MultiVector::basis(Algebra::N3, 4);
        let einf = em.add(&ep).unwrap();
        assert_eq!(einf.gp(&einf).unwrap().scalar_part(), 0.0);
    }

    #[test]
    fn test_blade_order() {
        let order = Algebra::E3.blade_order();
        assert_eq!(order, vec![0, 1, 2, 4, 3, 5, 6, 7]);
    }
}
