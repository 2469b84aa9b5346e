use super::{Data, Heap, Kind, ValueId};
use crate::lang::Error;
use crate::math::fmt_scalar;

type Result<T> = std::result::Result<T, Error>;

/// One record produced by the print operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    /// `"= "` for values, `"-> "` for references.
    pub relation: &'static str,
    pub type_name: &'static str,
    /// Shape or space of the value, empty for plain scalars.
    pub info: String,
    pub value: String,
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}{}", self.name, self.relation, self.value)
    }
}

impl Output {
    pub fn describe(heap: &Heap, id: ValueId) -> Result<Output> {
        let value = heap.value(id)?;
        let name = if value.name().is_empty() {
            "#".to_string()
        } else {
            value.name().to_string()
        };
        let relation = if value.kind() == Kind::PtrVar {
            "-> "
        } else {
            "= "
        };
        let data = heap.data(id)?;
        let info = match &*data {
            Data::MultiV(mv) => mv.algebra().name().to_string(),
            Data::Matrix(m) => format!("{}x{}", m.rows(), m.cols()),
            Data::Tensor(t) => dims(t.dims()),
            Data::TensorIdx(tv) => dims(tv.view.tensor().dims()),
            Data::List(elements) => format!("{} elements", elements.len()),
            Data::Str(s) => format!("{} characters", s.chars().count()),
            Data::Image(i) => format!("{}x{}", i.width(), i.height()),
            Data::VertexList(v) => format!("{} vertices", v.len()),
            _ => String::new(),
        };
        Ok(Output {
            name,
            relation,
            type_name: data.kind().name(),
            info,
            value: format_value(heap, id)?,
        })
    }
}

fn dims(dims: &[usize]) -> String {
    dims.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("x")
}

/// Text of the value `id` stands for, the way print shows it.
pub fn format_value(heap: &Heap, id: ValueId) -> Result<String> {
    let data = heap.data(id)?;
    Ok(match &*data {
        Data::Void => "void".to_string(),
        Data::Str(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::UInt(n) => n.to_string(),
        Data::Long(n) => n.to_string(),
        Data::Float(n) => fmt_scalar(f64::from(*n)),
        Data::Double(n) => fmt_scalar(*n),
        Data::MultiV(mv) => mv.to_string(),
        Data::Matrix(m) => m.to_string(),
        Data::Tensor(t) => t.to_string(),
        Data::TensorIdx(tv) => tv.view.to_string(),
        Data::Color(c) => c.to_string(),
        Data::Code(_) => "{...}".to_string(),
        Data::VertexList(v) => v.to_string(),
        Data::Image(i) => i.to_string(),
        Data::Scene(s) => s.to_string(),
        Data::List(elements) => {
            let mut parts = Vec::with_capacity(elements.len());
            for element in elements {
                let text = format_value(heap, *element)?;
                match &*heap.data(*element)? {
                    Data::Str(_) => parts.push(format!("\"{}\"", text)),
                    _ => parts.push(text),
                }
            }
            format!("[{}]", parts.join(", "))
        }
        Data::Ptr(_) | Data::PtrVar(_) => "void".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_list() {
        let mut heap = Heap::new();
        let s = heap.alloc("", Data::Str("hi".to_string()));
        let d = heap.alloc("", Data::Double(0.5));
        let inner = heap.alloc("", Data::List(vec![d]));
        let list = heap.alloc("L", Data::List(vec![s, inner]));
        let out = Output::describe(&heap, list).unwrap();
        assert_eq!(out.to_string(), "L = [\"hi\", [0.5]]");
        assert_eq!(out.info, "2 elements");
    }

    #[test]
    fn test_reference_relation() {
        let mut heap = Heap::new();
        let b = heap.alloc("b", Data::Int(3));
        let a = heap.alloc("a", Data::PtrVar(b));
        assert_eq!(Output::describe(&heap, a).unwrap().to_string(), "a -> 3");
        let t = heap.alloc("", Data::Int(7));
        assert_eq!(Output::describe(&heap, t).unwrap().to_string(), "# = 7");
    }
}
