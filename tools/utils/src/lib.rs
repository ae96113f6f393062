//! 命令行工具依赖的通用组件.

use std::io;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: io::Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_sep_to() {
        let mut buf = Vec::new();
        super::sep_to(&mut buf).unwrap();
        assert_eq!(buf.len(), super::SEP.len() + 1);
        assert!(buf.ends_with(b"-\n"));
    }
}
