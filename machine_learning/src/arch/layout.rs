use std::ops::Range;

/// What a block of parameters is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Weight,
    Bias,
}

/// A named tensor inside a flat parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBlock {
    pub name: String,
    pub kind: BlockKind,
    pub shape: Vec<usize>,
    pub range: Range<usize>,
}

/// Maps a flat parameter buffer into named tensors, in buffer order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamLayout {
    blocks: Vec<ParamBlock>,
}

impl ParamLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block right after the last one.
    pub fn push(&mut self, name: String, kind: BlockKind, shape: Vec<usize>) {
        let start = self.len();
        let end = start + shape.iter().product::<usize>();

        self.blocks.push(ParamBlock {
            name,
            kind,
            shape,
            range: start..end,
        });
    }

    /// Total amount of parameters covered by the layout.
    pub fn len(&self) -> usize {
        self.blocks.last().map(|b| b.range.end).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn blocks(&self) -> &[ParamBlock] {
        &self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_contiguous() {
        let mut layout = ParamLayout::new();
        layout.push("dense_0.weight".into(), BlockKind::Weight, vec![3, 2]);
        layout.push("dense_0.bias".into(), BlockKind::Bias, vec![2]);

        assert_eq!(layout.len(), 8);
        assert_eq!(layout.blocks()[0].range, 0..6);
        assert_eq!(layout.blocks()[1].range, 6..8);
    }
}
