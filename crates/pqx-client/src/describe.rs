//! Human-readable object descriptions for errors and log fields.

/// Append `<class> '<name>'` to `buf`, or just `<class>` when `obj_name` is
/// empty.
///
/// The buffer grows at most once: room is reserved for the description plus
/// `headroom` bytes the caller intends to append afterwards.
pub fn describe(buf: &mut String, class_name: &str, obj_name: &str, headroom: usize) {
    if obj_name.is_empty() {
        buf.reserve(class_name.len() + headroom);
        buf.push_str(class_name);
        return;
    }

    buf.reserve(class_name.len() + obj_name.len() + 3 + headroom);
    buf.push_str(class_name);
    buf.push_str(" '");
    buf.push_str(obj_name);
    buf.push('\'');
}

/// Something with a class name and an optional object name.
pub trait Named {
    /// Class of object, e.g. `"transaction"`.
    fn classname(&self) -> &'static str;

    /// Object name; empty when unnamed.
    fn name(&self) -> &str;

    /// `<class> '<name>'`, or just the class for unnamed objects.
    fn description(&self) -> String {
        let mut buf = String::new();
        describe(&mut buf, self.classname(), self.name(), 0);
        buf
    }
}
