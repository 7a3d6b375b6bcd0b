#[cfg(test)]
mod tests {
    use crate::compiler::{CompileOptions, MarkupCompiler, TemplateCompiler, VNode};
    use crate::error::{E_COMPILE_EXPRESSION, E_COMPILE_INVALID_ROOT, E_COMPILE_MULTIPLE_ROOTS};
    use serde_json::{json, Value};
    use std::rc::Rc;

    fn render(source: &str, state: Value) -> String {
        let compiler = MarkupCompiler::new();
        let artifact = compiler
            .compile(source, &CompileOptions::default())
            .unwrap();
        (artifact.render)(&state).to_html()
    }

    #[test]
    fn test_text_interpolation() {
        assert_eq!(
            render(
                "<p>Hello {{ user.name }}, you have {{ count }} items</p>",
                json!({"user": {"name": "Ada"}, "count": 3})
            ),
            "<p>Hello Ada, you have 3 items</p>"
        );
        assert_eq!(render("<p>[{{ missing }}]</p>", json!({})), "<p>[]</p>");
        assert_eq!(render("<p>{{ tags[1] }}</p>", json!({"tags": ["a", "b"]})), "<p>b</p>");
    }

    #[test]
    fn test_bound_attributes() {
        let html = render(
            r#"<a :href="link" :title="missing" v-bind:hidden="flag" class="nav">go</a>"#,
            json!({"link": "/docs?a=1&b=2", "flag": false}),
        );
        assert_eq!(html, r#"<a href="/docs?a=1&amp;b=2" class="nav">go</a>"#);
    }

    #[test]
    fn test_text_only_and_blank_templates() {
        assert_eq!(render("Hello", json!(null)), "Hello");
        assert_eq!(render("Hi {{ who }}", json!({"who": "you"})), "Hi you");
        assert_eq!(render("   \n  ", json!(null)), "<!---->");
        assert_eq!(render("", json!(null)), "<!---->");
    }

    #[test]
    fn test_text_around_root_is_dropped() {
        assert_eq!(render("  <div>a</div>\n", json!(null)), "<div>a</div>");
    }

    #[test]
    fn test_root_errors() {
        let compiler = MarkupCompiler::new();
        let options = CompileOptions::default();

        let err = compiler.compile("<p></p><p></p>", &options).unwrap_err();
        assert_eq!(err.code, E_COMPILE_MULTIPLE_ROOTS);

        let err = compiler.compile("<slot></slot>", &options).unwrap_err();
        assert_eq!(err.code, E_COMPILE_INVALID_ROOT);
        assert!(err.message.contains("<slot>"));
    }

    #[test]
    fn test_expression_errors_carry_ranges() {
        let compiler = MarkupCompiler::new();
        let with_range = CompileOptions::default();
        let without_range = CompileOptions {
            output_source_range: false,
            ..CompileOptions::default()
        };

        let err = compiler.compile("<p>{{ a + b }}</p>", &with_range).unwrap_err();
        assert_eq!(err.code, E_COMPILE_EXPRESSION);
        assert_eq!(err.message, "invalid expression: a + b");
        assert_eq!(err.range, Some((3, 14)));

        let err = compiler.compile("<p>{{ a + b }}</p>", &without_range).unwrap_err();
        assert_eq!(err.range, None);

        let err = compiler.compile(r#"<a :href="a b">x</a>"#, &with_range).unwrap_err();
        assert_eq!(err.code, E_COMPILE_EXPRESSION);
        assert_eq!(err.range, Some((3, 14)));
    }

    #[test]
    fn test_expression_range_points_at_failing_node() {
        let compiler = MarkupCompiler::new();
        let options = CompileOptions::default();

        let err = compiler
            .compile(r#"<p title="{{ a + b }}">{{ a + b }}</p>"#, &options)
            .unwrap_err();
        assert_eq!(err.range, Some((23, 34)));

        let source = r#"<div title=':id="a b"'><span :id="a b"></span></div>"#;
        let err = compiler.compile(source, &options).unwrap_err();
        assert_eq!(err.range, Some((29, 38)));

        let source = "<!-- {{ a + b }} --><P>{{ a + b }}</P>";
        let err = compiler.compile(source, &options).unwrap_err();
        assert_eq!(err.range, Some((23, 34)));
    }

    #[test]
    fn test_template_contents_are_lowered() {
        assert_eq!(
            render(
                "<div><template><p>{{ x }}</p></template></div>",
                json!({"x": "in"})
            ),
            "<div><template><p>in</p></template></div>"
        );
    }

    #[test]
    fn test_static_subtrees_are_hoisted() {
        let compiler = MarkupCompiler::new();
        let artifact = compiler
            .compile(
                "<div><ul><li>a</li><li>b</li></ul><p>{{ x }}</p></div>",
                &CompileOptions::default(),
            )
            .unwrap();
        assert_eq!(artifact.static_render_fns.len(), 1);

        let hoisted = (artifact.static_render_fns[0])();
        assert!(hoisted.is_static());
        assert_eq!(hoisted.to_html(), "<ul><li>a</li><li>b</li></ul>");

        let vnode = (artifact.render)(&json!({"x": 1}));
        assert_eq!(vnode.to_html(), "<div><ul><li>a</li><li>b</li></ul><p>1</p></div>");
        match vnode {
            VNode::Element { children, .. } => {
                assert!(children[0].is_static());
                assert!(!children[1].is_static());
            }
            other => panic!("unexpected root: {:?}", other),
        }
    }

    #[test]
    fn test_static_root_and_lone_text() {
        let compiler = MarkupCompiler::new();
        let options = CompileOptions::default();

        let whole = compiler.compile("<div><span>a</span></div>", &options).unwrap();
        assert_eq!(whole.static_render_fns.len(), 1);
        assert!((whole.render)(&Value::Null).is_static());

        let lone = compiler.compile("<p>just text</p>", &options).unwrap();
        assert!(lone.static_render_fns.is_empty());
    }

    #[test]
    fn test_custom_delimiters() {
        let compiler = MarkupCompiler::new();
        let options = CompileOptions {
            delimiters: Some(("${".to_string(), "}".to_string())),
            ..CompileOptions::default()
        };
        let artifact = compiler
            .compile("<p>${ name } {{ name }}</p>", &options)
            .unwrap();
        assert_eq!(
            (artifact.render)(&json!({"name": "x"})).to_html(),
            "<p>x {{ name }}</p>"
        );
    }

    #[test]
    fn test_comments_option() {
        let compiler = MarkupCompiler::new();
        let source = "<div><!-- note --><p>x</p></div>";

        let dropped = compiler.compile(source, &CompileOptions::default()).unwrap();
        assert_eq!((dropped.render)(&Value::Null).to_html(), "<div><p>x</p></div>");

        let kept = compiler
            .compile(
                source,
                &CompileOptions {
                    comments: true,
                    ..CompileOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            (kept.render)(&Value::Null).to_html(),
            "<div><!-- note --><p>x</p></div>"
        );
    }

    #[test]
    fn test_newline_decoding_flags() {
        let compiler = MarkupCompiler::new();
        let source = r#"<a href="x&#10;y" title="a&#10;b">go</a>"#;

        let attrs_for = |options: &CompileOptions| match (compiler
            .compile(source, options)
            .unwrap()
            .render)(&Value::Null)
        {
            VNode::Element { attrs, .. } => attrs,
            other => panic!("unexpected root: {:?}", other),
        };

        let literal = attrs_for(&CompileOptions::default());
        assert_eq!(literal[0], ("href".to_string(), "x&#10;y".to_string()));
        assert_eq!(literal[1], ("title".to_string(), "a&#10;b".to_string()));

        let decoded = attrs_for(&CompileOptions {
            should_decode_newlines: true,
            should_decode_newlines_for_href: false,
            ..CompileOptions::default()
        });
        assert_eq!(decoded[0], ("href".to_string(), "x&#10;y".to_string()));
        assert_eq!(decoded[1], ("title".to_string(), "a\nb".to_string()));
    }

    #[test]
    fn test_artifacts_are_memoized_per_options() {
        let compiler = MarkupCompiler::new();
        let options = CompileOptions::default();

        let first = compiler.compile("<p>{{ a }}</p>", &options).unwrap();
        let second = compiler.compile("<p>{{ a }}</p>", &options).unwrap();
        assert!(Rc::ptr_eq(&first.render, &second.render));
        assert_eq!(compiler.cached_artifacts(), 1);

        let commented = CompileOptions {
            comments: true,
            ..CompileOptions::default()
        };
        let third = compiler.compile("<p>{{ a }}</p>", &commented).unwrap();
        assert!(!Rc::ptr_eq(&first.render, &third.render));
        assert_eq!(compiler.cached_artifacts(), 2);

        assert!(compiler.compile("<p></p><p></p>", &options).is_err());
        assert_eq!(compiler.cached_artifacts(), 2);
    }

    #[test]
    fn test_shared_compile_entry() {
        let artifact = crate::compile("<b>{{ n }}</b>", &CompileOptions::default()).unwrap();
        assert_eq!((artifact.render)(&json!({"n": 7})).to_html(), "<b>7</b>");
    }
}
