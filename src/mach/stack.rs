use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Stack enforced and size limited vector
///
/// `lock` records the current depth as a barrier. Nothing below the top
/// barrier can be popped until the matching `unlock`.

pub struct Stack<T> {
    overflow_message: &'static str,
    max_len: usize,
    vec: Vec<T>,
    locks: Vec<usize>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {:?}", self.vec, self.locks)
    }
}

impl<T> Stack<T> {
    pub fn new(overflow_message: &'static str, max_len: usize) -> Stack<T> {
        Stack {
            overflow_message,
            max_len,
            vec: vec![],
            locks: vec![],
        }
    }
    fn overflow_check(&self) -> Result<()> {
        if self.vec.len() > self.max_len {
            Err(error!(OutOfMemory; self.overflow_message))
        } else {
            Ok(())
        }
    }
    fn underflow_error(&self) -> Error {
        error!(Internal; "Stack underflow.")
    }
    fn floor(&self) -> usize {
        self.locks.last().copied().unwrap_or(0)
    }
    pub fn clear(&mut self) {
        self.vec.clear();
        self.locks.clear();
    }
    pub fn len(&self) -> usize {
        self.vec.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
    /// Depth above the top barrier.
    pub fn act_depth(&self) -> usize {
        self.vec.len() - self.floor()
    }
    /// Number of active barriers.
    pub fn lock_depth(&self) -> usize {
        self.locks.len()
    }
    /// Top element, if it lies above the top barrier.
    pub fn last(&self) -> Option<&T> {
        if self.act_depth() == 0 {
            None
        } else {
            self.vec.last()
        }
    }
    pub fn push(&mut self, val: T) -> Result<()> {
        self.vec.push(val);
        self.overflow_check()
    }
    pub fn pop(&mut self) -> Result<T> {
        if self.act_depth() == 0 {
            return Err(self.underflow_error());
        }
        match self.vec.pop() {
            Some(v) => Ok(v),
            None => Err(self.underflow_error()),
        }
    }
    pub fn lock(&mut self) {
        self.locks.push(self.vec.len());
    }
    pub fn unlock(&mut self) -> Result<()> {
        match self.locks.pop() {
            Some(_) => Ok(()),
            None => Err(error!(Internal; "Unlock without lock.")),
        }
    }
    /// Remove everything above the top barrier, bottom first.
    pub fn drain_frame(&mut self) -> Vec<T> {
        let floor = self.floor();
        self.vec.drain(floor..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_a_barrier() {
        let mut s: Stack<u8> = Stack::new("", 10);
        s.push(1).unwrap();
        s.lock();
        s.push(2).unwrap();
        assert_eq!(s.pop().unwrap(), 2);
        assert!(s.pop().is_err());
        assert_eq!(s.last(), None);
        s.unlock().unwrap();
        assert_eq!(s.pop().unwrap(), 1);
        assert!(s.unlock().is_err());
    }

    #[test]
    fn test_nested_locks() {
        let mut s: Stack<u8> = Stack::new("", 10);
        s.lock();
        s.push(1).unwrap();
        s.lock();
        s.push(2).unwrap();
        s.push(3).unwrap();
        assert_eq!(s.act_depth(), 2);
        assert_eq!(s.drain_frame(), vec![2, 3]);
        s.unlock().unwrap();
        assert_eq!(s.act_depth(), 1);
        assert_eq!(s.lock_depth(), 1);
    }

    #[test]
    fn test_overflow() {
        let mut s: Stack<u8> = Stack::new("Stack overflow.", 1);
        s.push(1).unwrap();
        let e = s.push(2).unwrap_err();
        assert_eq!(e.text(), "Stack overflow.");
    }
}
