use super::{Kind, Scene, ValueId};
use crate::lang::ast::ElementList;
use crate::math::{Algebra, Color, Image, Matrix, MultiVector, Tensor, TensorIdx, VertexList};
use std::rc::Rc;

/// Part of the target value a pointer kind aliases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    Whole,
    /// Flat position in a numeric payload (matrix, tensor) or blade
    /// index of a multivector component.
    Element(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alias {
    pub kind: Kind,
    pub target: ValueId,
    pub field: Field,
}

/// A tensor index view. `source` is the tensor variable the view was
/// taken from, if any, so that assignments can write back.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorView {
    pub view: TensorIdx,
    pub source: Option<ValueId>,
}

/// ## Value payload
///
/// `Clone` is shallow: a cloned `List` shares its element ids. Deep
/// copies go through `Heap::clone_data`.

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Void,
    Str(String),
    Int(i32),
    UInt(u32),
    Long(i64),
    Float(f32),
    Double(f64),
    MultiV(MultiVector),
    Matrix(Matrix),
    Tensor(Tensor),
    TensorIdx(TensorView),
    Color(Color),
    Code(Rc<ElementList>),
    List(Vec<ValueId>),
    VertexList(VertexList),
    Image(Image),
    Scene(Scene),
    Ptr(Alias),
    PtrVar(ValueId),
}

impl Data {
    pub fn kind(&self) -> Kind {
        match self {
            Data::Void => Kind::Void,
            Data::Str(_) => Kind::Str,
            Data::Int(_) => Kind::Int,
            Data::UInt(_) => Kind::UInt,
            Data::Long(_) => Kind::Long,
            Data::Float(_) => Kind::Float,
            Data::Double(_) => Kind::Double,
            Data::MultiV(_) => Kind::MultiV,
            Data::Matrix(_) => Kind::Matrix,
            Data::Tensor(_) => Kind::Tensor,
            Data::TensorIdx(_) => Kind::TensorIdx,
            Data::Color(_) => Kind::Color,
            Data::Code(_) => Kind::Code,
            Data::List(_) => Kind::List,
            Data::VertexList(_) => Kind::VertexList,
            Data::Image(_) => Kind::Image,
            Data::Scene(_) => Kind::Scene,
            Data::Ptr(alias) => alias.kind.ptr_of().unwrap_or(Kind::PtrVar),
            Data::PtrVar(_) => Kind::PtrVar,
        }
    }

    /// Freshly initialised payload of `kind`. Pointer kinds cannot be
    /// created without a target.
    pub fn default_for(kind: Kind) -> Option<Data> {
        Some(match kind {
            Kind::Void => Data::Void,
            Kind::Str => Data::Str(String::new()),
            Kind::Int => Data::Int(0),
            Kind::UInt => Data::UInt(0),
            Kind::Long => Data::Long(0),
            Kind::Float => Data::Float(0.0),
            Kind::Double => Data::Double(0.0),
            Kind::MultiV => Data::MultiV(MultiVector::zero(Algebra::E3)),
            Kind::Matrix => Data::Matrix(Matrix::new(1, 1)),
            Kind::Tensor => Data::Tensor(Tensor::scalar(0.0)),
            Kind::TensorIdx => Data::TensorIdx(TensorView {
                view: TensorIdx::whole(Tensor::scalar(0.0)),
                source: None,
            }),
            Kind::Color => Data::Color(Color::default()),
            Kind::Code => Data::Code(Rc::new(ElementList::default())),
            Kind::List => Data::List(vec![]),
            Kind::VertexList => Data::VertexList(VertexList::new()),
            Kind::Image => Data::Image(Image::new(1, 1, Color::default())?),
            Kind::Scene => Data::Scene(Scene::default()),
            _ => return None,
        })
    }

    /// Plain numeric value of a scalar kind, without any snapping.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Data::Int(n) => Some(f64::from(*n)),
            Data::UInt(n) => Some(f64::from(*n)),
            Data::Long(n) => Some(*n as f64),
            Data::Float(n) => Some(f64::from(*n)),
            Data::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Target of a pointer payload.
    pub fn pointee(&self) -> Option<ValueId> {
        match self {
            Data::Ptr(alias) => Some(alias.target),
            Data::PtrVar(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Data::Void)
    }
}

/// ## Dynamic value

#[derive(Debug, Clone)]
pub struct Value {
    pub(super) name: String,
    pub(super) protected: bool,
    pub(super) data: Data,
    /// Values whose pointer payload targets this one.
    pub(super) referrers: Vec<ValueId>,
    /// Variables a list was built from, element by element.
    pub(super) sources: Vec<Option<ValueId>>,
}

impl Value {
    pub fn new(name: &str, data: Data) -> Value {
        Value {
            name: name.to_string(),
            protected: false,
            data,
            referrers: vec![],
            sources: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn kind(&self) -> Kind {
        self.data.kind()
    }

    pub fn is_ptr(&self) -> bool {
        self.kind().is_ptr()
    }

    pub fn referrers(&self) -> &[ValueId] {
        &self.referrers
    }
}
