// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Uniform tree rendering for plan introspection.
//!
//! Box-drawing connectors, one 4-column cell per depth level, `╙` for
//! the last sibling and `╟` otherwise, with `║` continuing past open
//! branches. This is a debug contract, not a stable machine format.

/// Anything with a label and ordered children can be rendered.
pub trait TreeRender {
    fn label(&self) -> String;
    fn children(&self) -> Vec<&dyn TreeRender>;
}

/// Render a tree to its indented multi-line form.
pub fn pretty(root: &dyn TreeRender) -> String {
    let mut out = String::new();
    out.push_str(&root.label());
    out.push('\n');
    let children = root.children();
    let count = children.len();
    let mut trail = Vec::new();
    for (i, child) in children.into_iter().enumerate() {
        render(child, &mut out, &mut trail, i + 1 == count);
    }
    out
}

fn render(node: &dyn TreeRender, out: &mut String, trail: &mut Vec<bool>, last: bool) {
    for &ancestor_was_last in trail.iter() {
        out.push_str(if ancestor_was_last { "    " } else { "║   " });
    }
    out.push_str(if last { "╙── " } else { "╟── " });
    out.push_str(&node.label());
    out.push('\n');

    trail.push(last);
    let children = node.children();
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        render(child, out, trail, i + 1 == count);
    }
    trail.pop();
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf(&'static str);
    struct Branch(&'static str, Vec<Box<dyn TreeRender>>);

    impl TreeRender for Leaf {
        fn label(&self) -> String {
            self.0.to_string()
        }
        fn children(&self) -> Vec<&dyn TreeRender> {
            Vec::new()
        }
    }

    impl TreeRender for Branch {
        fn label(&self) -> String {
            self.0.to_string()
        }
        fn children(&self) -> Vec<&dyn TreeRender> {
            self.1.iter().map(|c| c.as_ref()).collect()
        }
    }

    #[test]
    fn renders_connectors_and_indent() {
        let tree = Branch(
            "root",
            vec![
                Box::new(Branch("left", vec![Box::new(Leaf("leaf"))])),
                Box::new(Leaf("right")),
            ],
        );
        let rendered = pretty(&tree);
        assert_eq!(
            rendered,
            "root\n\
             ╟── left\n\
             ║   ╙── leaf\n\
             ╙── right\n"
        );
    }

    #[test]
    fn last_sibling_uses_closing_connector() {
        let tree = Branch("root", vec![Box::new(Leaf("only"))]);
        assert_eq!(pretty(&tree), "root\n╙── only\n");
    }
}
