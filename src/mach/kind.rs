/// ## Value kinds
///
/// Every plain kind has a pointer twin that aliases a field of another
/// value. `PtrVar` is the reference to a whole value.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Void,
    Str,
    Int,
    UInt,
    Long,
    Float,
    Double,
    MultiV,
    Matrix,
    Tensor,
    TensorIdx,
    Color,
    Code,
    List,
    VertexList,
    Image,
    Scene,
    PtrStr,
    PtrInt,
    PtrUInt,
    PtrLong,
    PtrFloat,
    PtrDouble,
    PtrMultiV,
    PtrMatrix,
    PtrTensor,
    PtrTensorIdx,
    PtrColor,
    PtrCode,
    PtrList,
    PtrVertexList,
    PtrImage,
    PtrScene,
    PtrVar,
}

impl Kind {
    pub fn is_ptr(self) -> bool {
        self.base() != self || self == Kind::PtrVar
    }

    /// The aliased kind of a pointer kind; plain kinds map to themselves.
    pub fn base(self) -> Kind {
        use Kind::*;
        match self {
            PtrStr => Str,
            PtrInt => Int,
            PtrUInt => UInt,
            PtrLong => Long,
            PtrFloat => Float,
            PtrDouble => Double,
            PtrMultiV => MultiV,
            PtrMatrix => Matrix,
            PtrTensor => Tensor,
            PtrTensorIdx => TensorIdx,
            PtrColor => Color,
            PtrCode => Code,
            PtrList => List,
            PtrVertexList => VertexList,
            PtrImage => Image,
            PtrScene => Scene,
            _ => self,
        }
    }

    pub fn ptr_of(self) -> Option<Kind> {
        use Kind::*;
        Some(match self {
            Str => PtrStr,
            Int => PtrInt,
            UInt => PtrUInt,
            Long => PtrLong,
            Float => PtrFloat,
            Double => PtrDouble,
            MultiV => PtrMultiV,
            Matrix => PtrMatrix,
            Tensor => PtrTensor,
            TensorIdx => PtrTensorIdx,
            Color => PtrColor,
            Code => PtrCode,
            List => PtrList,
            VertexList => PtrVertexList,
            Image => PtrImage,
            Scene => PtrScene,
            _ => return None,
        })
    }

    pub fn is_scalar(self) -> bool {
        use Kind::*;
        matches!(self.base(), Int | UInt | Long | Float | Double)
    }

    pub fn name(self) -> &'static str {
        use Kind::*;
        match self {
            Void => "void",
            Str => "string",
            Int => "int",
            UInt => "uint",
            Long => "long",
            Float => "float",
            Double => "double",
            MultiV => "multivector",
            Matrix => "matrix",
            Tensor => "tensor",
            TensorIdx => "tensor index",
            Color => "color",
            Code => "code",
            List => "list",
            VertexList => "vertex list",
            Image => "image",
            Scene => "scene",
            PtrStr => "pointer to string",
            PtrInt => "pointer to int",
            PtrUInt => "pointer to uint",
            PtrLong => "pointer to long",
            PtrFloat => "pointer to float",
            PtrDouble => "pointer to double",
            PtrMultiV => "pointer to multivector",
            PtrMatrix => "pointer to matrix",
            PtrTensor => "pointer to tensor",
            PtrTensorIdx => "pointer to tensor index",
            PtrColor => "pointer to color",
            PtrCode => "pointer to code",
            PtrList => "pointer to list",
            PtrVertexList => "pointer to vertex list",
            PtrImage => "pointer to image",
            PtrScene => "pointer to scene",
            PtrVar => "variable reference",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
