use std::collections::HashMap;

/// ## Dense tensor, last index fastest

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    dims: Vec<usize>,
    data: Vec<f64>,
}

/// Visit every index tuple of `dims` in row-major order.
fn for_each_index<F: FnMut(&[usize])>(dims: &[usize], mut f: F) {
    let mut idx = vec![0; dims.len()];
    if dims.iter().any(|d| *d == 0) {
        return;
    }
    loop {
        f(&idx);
        let mut k = dims.len();
        loop {
            if k == 0 {
                return;
            }
            k -= 1;
            idx[k] += 1;
            if idx[k] < dims[k] {
                break;
            }
            idx[k] = 0;
        }
    }
}

impl Tensor {
    pub fn zeros(dims: &[usize]) -> Option<Tensor> {
        if dims.iter().any(|d| *d == 0) {
            return None;
        }
        Some(Tensor {
            dims: dims.to_vec(),
            data: vec![0.0; dims.iter().product()],
        })
    }

    /// Rank zero tensor holding one value.
    pub fn scalar(val: f64) -> Tensor {
        Tensor {
            dims: vec![],
            data: vec![val],
        }
    }

    pub fn from_data(dims: &[usize], data: Vec<f64>) -> Option<Tensor> {
        if data.len() != dims.iter().product::<usize>() {
            return None;
        }
        Some(Tensor {
            dims: dims.to_vec(),
            data,
        })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    fn offset(&self, idx: &[usize]) -> usize {
        idx.iter()
            .zip(self.dims.iter())
            .fold(0, |acc, (i, d)| acc * d + i)
    }

    /// Flat position of a one-based index tuple.
    pub fn flat_index(&self, idx: &[usize]) -> Option<usize> {
        if idx.len() != self.dims.len() {
            return None;
        }
        if idx.iter().zip(self.dims.iter()).any(|(i, d)| *i == 0 || i > d) {
            return None;
        }
        let zero: Vec<usize> = idx.iter().map(|i| i - 1).collect();
        Some(self.offset(&zero))
    }

    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Tensor {
        Tensor {
            dims: self.dims.clone(),
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }

    pub fn strip(&mut self, sensitivity: f64) {
        for v in self.data.iter_mut() {
            if v.abs() <= sensitivity {
                *v = 0.0;
            }
        }
    }

    /// Write `src` into the part of `self` selected by `indices`.
    /// The free ids of the view and of `src` have to agree.
    pub fn assign_view(&mut self, indices: &[i32], src: &TensorIdx) -> Option<()> {
        let free = self.view_ids(indices)?;
        let src = src.contract();
        let src_free = src.free();
        if free.len() != src_free.len() {
            return None;
        }
        for (id, dim) in free.iter() {
            if !src_free.contains(&(*id, *dim)) {
                return None;
            }
        }
        let dims: Vec<usize> = free.iter().map(|(_, d)| *d).collect();
        let mut writes = vec![];
        for_each_index(&dims, |idx| {
            let assign: HashMap<i32, usize> = free
                .iter()
                .zip(idx.iter())
                .map(|((id, _), i)| (*id, *i))
                .collect();
            let target: Vec<usize> = indices
                .iter()
                .map(|ix| if *ix > 0 { *ix as usize - 1 } else { assign[ix] })
                .collect();
            writes.push((target, src.value_at(&assign)));
        });
        for (target, val) in writes {
            let off = self.offset(&target);
            self.data[off] = val;
        }
        Some(())
    }

    /// Set every element of the view selected by `indices` to `val`.
    pub fn fill_view(&mut self, indices: &[i32], val: f64) -> Option<()> {
        let free = self.view_ids(indices)?;
        let dims: Vec<usize> = free.iter().map(|(_, d)| *d).collect();
        let mut targets = vec![];
        for_each_index(&dims, |idx| {
            let assign: HashMap<i32, usize> = free
                .iter()
                .zip(idx.iter())
                .map(|((id, _), i)| (*id, *i))
                .collect();
            targets.push(
                indices
                    .iter()
                    .map(|ix| if *ix > 0 { *ix as usize - 1 } else { assign[ix] })
                    .collect::<Vec<usize>>(),
            );
        });
        for target in targets {
            let off = self.offset(&target);
            self.data[off] = val;
        }
        Some(())
    }

    /// Free ids of a writable view; repeated ids are not writable.
    fn view_ids(&self, indices: &[i32]) -> Option<Vec<(i32, usize)>> {
        let view = TensorIdx::new(self.clone(), indices.to_vec())?;
        let free = view.free();
        if free.len() != indices.iter().filter(|i| **i < 0).count() {
            return None;
        }
        Some(free)
    }
}

impl std::fmt::Display for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.dims.is_empty() {
            return write!(f, "{}", super::fmt_scalar(self.data[0]));
        }
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        let data: Vec<String> = self.data.iter().map(|v| super::fmt_scalar(*v)).collect();
        write!(f, "[{}]({})", dims.join("x"), data.join(", "))
    }
}

/// ## Indexed view on a tensor
///
/// Positive indices select a fixed (one-based) position, negative indices
/// are free index ids. An id used twice is summed over.

#[derive(Debug, Clone, PartialEq)]
pub struct TensorIdx {
    tensor: Tensor,
    indices: Vec<i32>,
}

impl TensorIdx {
    pub fn new(tensor: Tensor, indices: Vec<i32>) -> Option<TensorIdx> {
        if indices.len() != tensor.rank() {
            return None;
        }
        let mut seen: HashMap<i32, (usize, usize)> = HashMap::new();
        for (ix, dim) in indices.iter().zip(tensor.dims.iter()) {
            if *ix == 0 || (*ix > 0 && *ix as usize > *dim) {
                return None;
            }
            if *ix < 0 {
                let e = seen.entry(*ix).or_insert((*dim, 0));
                if e.0 != *dim {
                    return None;
                }
                e.1 += 1;
                if e.1 > 2 {
                    return None;
                }
            }
        }
        Some(TensorIdx { tensor, indices })
    }

    /// View over the whole tensor with ids `-1, -2, ...`.
    pub fn whole(tensor: Tensor) -> TensorIdx {
        let indices = (1..=tensor.rank() as i32).map(|i| -i).collect();
        TensorIdx { tensor, indices }
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    fn id_counts(&self) -> Vec<(i32, usize, usize)> {
        let mut ids: Vec<(i32, usize, usize)> = vec![];
        for (ix, dim) in self.indices.iter().zip(self.tensor.dims.iter()) {
            if *ix >= 0 {
                continue;
            }
            match ids.iter_mut().find(|(id, _, _)| id == ix) {
                Some(e) => e.2 += 1,
                None => ids.push((*ix, *dim, 1)),
            }
        }
        ids
    }

    /// Free ids with their dimension, in order of first use.
    pub fn free(&self) -> Vec<(i32, usize)> {
        self.id_counts()
            .into_iter()
            .filter(|(_, _, n)| *n == 1)
            .map(|(id, dim, _)| (id, dim))
            .collect()
    }

    fn value_at(&self, assign: &HashMap<i32, usize>) -> f64 {
        let idx: Vec<usize> = self
            .indices
            .iter()
            .map(|ix| {
                if *ix > 0 {
                    *ix as usize - 1
                } else {
                    assign.get(ix).copied().unwrap_or(0)
                }
            })
            .collect();
        self.tensor.data[self.tensor.offset(&idx)]
    }

    /// Einstein product: ids used once overall stay free, ids used twice
    /// are summed over.
    pub fn product(&self, other: &TensorIdx) -> Option<TensorIdx> {
        let mut ids: Vec<(i32, usize, usize)> = self.id_counts();
        for (id, dim, n) in other.id_counts() {
            match ids.iter_mut().find(|(i, _, _)| *i == id) {
                Some(e) => {
                    if e.1 != dim {
                        return None;
                    }
                    e.2 += n;
                }
                None => ids.push((id, dim, n)),
            }
        }
        if ids.iter().any(|(_, _, n)| *n > 2) {
            return None;
        }
        let free: Vec<(i32, usize)> = ids
            .iter()
            .filter(|(_, _, n)| *n == 1)
            .map(|(id, dim, _)| (*id, *dim))
            .collect();
        let summed: Vec<(i32, usize)> = ids
            .iter()
            .filter(|(_, _, n)| *n == 2)
            .map(|(id, dim, _)| (*id, *dim))
            .collect();
        let free_dims: Vec<usize> = free.iter().map(|(_, d)| *d).collect();
        let sum_dims: Vec<usize> = summed.iter().map(|(_, d)| *d).collect();
        let mut data = vec![];
        for_each_index(&free_dims, |fidx| {
            let mut assign: HashMap<i32, usize> = free
                .iter()
                .zip(fidx.iter())
                .map(|((id, _), i)| (*id, *i))
                .collect();
            let mut sum = 0.0;
            for_each_index(&sum_dims, |sidx| {
                for ((id, _), i) in summed.iter().zip(sidx.iter()) {
                    assign.insert(*id, *i);
                }
                sum += self.value_at(&assign) * other.value_at(&assign);
            });
            data.push(sum);
        });
        Some(TensorIdx {
            tensor: Tensor {
                dims: free_dims,
                data,
            },
            indices: free.iter().map(|(id, _)| *id).collect(),
        })
    }

    /// Resolve repeated ids and fixed positions into a fresh view whose
    /// indices are all distinct free ids.
    pub fn contract(&self) -> TensorIdx {
        let unit = TensorIdx {
            tensor: Tensor::scalar(1.0),
            indices: vec![],
        };
        match self.product(&unit) {
            Some(t) => t,
            None => self.clone(),
        }
    }

    /// Element-wise combination; both views need the same free ids.
    pub fn combine<F: Fn(f64, f64) -> f64>(&self, other: &TensorIdx, f: F) -> Option<TensorIdx> {
        let a = self.contract();
        let b = other.contract();
        let free = a.free();
        let mut other_free = b.free();
        if free.len() != other_free.len() {
            return None;
        }
        other_free.retain(|e| free.contains(e));
        if other_free.len() != free.len() {
            return None;
        }
        let dims: Vec<usize> = free.iter().map(|(_, d)| *d).collect();
        let mut data = vec![];
        for_each_index(&dims, |idx| {
            let assign: HashMap<i32, usize> = free
                .iter()
                .zip(idx.iter())
                .map(|((id, _), i)| (*id, *i))
                .collect();
            data.push(f(a.value_at(&assign), b.value_at(&assign)));
        });
        Some(TensorIdx {
            tensor: Tensor { dims, data },
            indices: free.iter().map(|(id, _)| *id).collect(),
        })
    }

    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> TensorIdx {
        let c = self.contract();
        TensorIdx {
            tensor: c.tensor.map(f),
            indices: c.indices,
        }
    }

    /// Value of a view without free ids.
    pub fn scalar(&self) -> Option<f64> {
        let c = self.contract();
        if c.indices.is_empty() {
            c.tensor.data.first().copied()
        } else {
            None
        }
    }

    pub fn to_tensor(&self) -> Tensor {
        self.contract().tensor
    }

    pub fn strip(&mut self, sensitivity: f64) {
        self.tensor.strip(sensitivity);
    }
}

impl std::fmt::Display for TensorIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let idx: Vec<String> = self.indices.iter().map(|i| i.to_string()).collect();
        write!(f, "{}({})", self.tensor, idx.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat(data: Vec<f64>) -> Tensor {
        Tensor::from_data(&[2, 2], data).unwrap()
    }

    #[test]
    fn test_trace() {
        let t = TensorIdx::new(mat(vec![1.0, 2.0, 3.0, 4.0]), vec![-1, -1]).unwrap();
        assert_eq!(t.scalar(), Some(5.0));
    }

    #[test]
    fn test_matrix_product_by_contraction() {
        let a = TensorIdx::new(mat(vec![1.0, 2.0, 3.0, 4.0]), vec![-1, -2]).unwrap();
        let b = TensorIdx::new(mat(vec![0.0, 1.0, 1.0, 0.0]), vec![-2, -3]).unwrap();
        let c = a.product(&b).unwrap();
        assert_eq!(c.indices(), &[-1, -3]);
        assert_eq!(c.tensor().as_slice(), &[2.0, 1.0, 4.0, 3.0]);
    }

    #[test]
    fn test_fixed_index_selects_row() {
        let a = TensorIdx::new(mat(vec![1.0, 2.0, 3.0, 4.0]), vec![2, -1]).unwrap();
        assert_eq!(a.to_tensor().as_slice(), &[3.0, 4.0]);
        assert!(TensorIdx::new(mat(vec![0.0; 4]), vec![3, -1]).is_none());
    }

    #[test]
    fn test_combine_aligns_ids() {
        let a = TensorIdx::new(mat(vec![1.0, 2.0, 3.0, 4.0]), vec![-1, -2]).unwrap();
        let b = TensorIdx::new(mat(vec![1.0, 2.0, 3.0, 4.0]), vec![-2, -1]).unwrap();
        let c = a.combine(&b, |x, y| x + y).unwrap();
        assert_eq!(c.tensor().as_slice(), &[2.0, 5.0, 5.0, 8.0]);
    }

    #[test]
    fn test_assign_view() {
        let mut t = mat(vec![0.0; 4]);
        let row = TensorIdx::new(Tensor::from_data(&[2], vec![7.0, 8.0]).unwrap(), vec![-1]).unwrap();
        t.assign_view(&[1, -1], &row).unwrap();
        assert_eq!(t.as_slice(), &[7.0, 8.0, 0.0, 0.0]);
        t.fill_view(&[-1, 2], 9.0).unwrap();
        assert_eq!(t.as_slice(), &[7.0, 9.0, 0.0, 9.0]);
    }
}
