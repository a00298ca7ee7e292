use mailparse::ParsedMail;

/// Depth-first iterator over a MIME tree.
///
/// The root part comes first, then each subpart followed by its own
/// subparts, in document order.
#[derive(Debug)]
pub struct PartsIterator<'a> {
    pub stack: Vec<&'a ParsedMail<'a>>,
}

impl<'a> PartsIterator<'a> {
    pub fn new(part: &'a ParsedMail<'a>) -> Self {
        Self { stack: vec![part] }
    }
}

impl<'a> Iterator for PartsIterator<'a> {
    type Item = &'a ParsedMail<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stack.pop()?;

        for part in item.subparts.iter().rev() {
            self.stack.push(part)
        }

        Some(item)
    }
}
