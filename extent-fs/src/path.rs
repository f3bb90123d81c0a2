use alloc::string::String;
use alloc::vec::Vec;

#[inline]
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// 路径的各段，连续的`/`不产生空段
pub fn components(path: &str) -> impl DoubleEndedIterator<Item = &str> {
    path.split('/').filter(|cmp| !cmp.is_empty())
}

/// 返回不以`/`结束、不包含相对项的绝对路径。
///
/// # 参数
///
/// `cwd`: 会话的当前路径，为绝对路径。
///
/// 根目录的`..`仍是根目录，所以结果总在根目录之下。
pub fn canonicalize(path: &str, cwd: &str) -> Option<String> {
    if path.is_empty() || !is_absolute(cwd) {
        return None;
    }

    let mut cmps = Vec::new();
    if !is_absolute(path) {
        cmps.extend(components(cwd));
    }

    for cmp in components(path) {
        match cmp {
            ".." => {
                cmps.pop();
            }
            "." => (),
            s => cmps.push(s),
        }
    }

    if cmps.is_empty() {
        return Some(String::from("/"));
    }

    let mut canonical = String::new();
    for cmp in cmps {
        canonical.push('/');
        canonical.push_str(cmp);
    }
    Some(canonical)
}

/// Returns the final component of the path, if there is one.
pub fn file_name(path: &str) -> Option<&str> {
    components(path).next_back()
}
