mod tests {
    use crate::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("strain")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect()
    }

    fn parse(args: &[&str]) -> CliArgs {
        let (kept, _) = retain_known_flags(argv(args));
        CliArgs::try_parse_from(kept).expect("should parse")
    }

    #[test]
    fn test_no_flags_yields_library_defaults() {
        let cfg = parse(&[]).into_config();
        assert_eq!(cfg, HarnessConfig::default());
    }

    #[test]
    fn test_equals_form_flags_override_defaults() {
        let cfg = parse(&[
            "--duration=3",
            "--threads=5",
            "--payloadKB=16",
            "--retainEvery=0",
            "--primeLimit=1000",
            "--contention=false",
        ])
        .into_config();
        assert_eq!(cfg.duration, Duration::from_secs(3));
        assert_eq!(cfg.workers, 5);
        assert_eq!(cfg.payload_bytes, 16 * 1024);
        assert_eq!(cfg.retain_every, 0);
        assert_eq!(cfg.prime_limit, 1000);
        assert!(!cfg.contention);
    }

    #[test]
    fn test_space_separated_values_are_accepted() {
        let cfg = parse(&["--threads", "7", "--queueCapacity", "9"]).into_config();
        assert_eq!(cfg.workers, 7);
        assert_eq!(cfg.queue_capacity, 9);
    }

    #[test]
    fn test_unknown_flags_are_ignored() {
        let (kept, dropped) = retain_known_flags(argv(&[
            "--verbose",
            "--duration=2",
            "--color=always",
            "--mystery",
            "value",
            "stray",
            "--threads=3",
        ]));
        assert_eq!(kept, argv(&["--duration=2", "--threads=3"]));
        assert_eq!(dropped, vec!["--verbose", "--color=always", "--mystery", "value", "stray"]);

        let cfg = CliArgs::try_parse_from(kept).expect("should parse").into_config();
        assert_eq!(cfg.duration, Duration::from_secs(2));
        assert_eq!(cfg.workers, 3);
    }

    #[test]
    fn test_malformed_values_fail_fast() {
        for bad in [
            "--duration=soon",
            "--threads=-1",
            "--payloadKB=big",
            "--primeLimit=1.5",
            "--contention=maybe",
            "--format=xml",
        ] {
            let (kept, _) = retain_known_flags(argv(&[bad]));
            assert!(CliArgs::try_parse_from(kept).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_payload_kb_overflow_is_a_parse_error() {
        let err = parse_payload_kb(&usize::MAX.to_string()).unwrap_err();
        assert!(err.contains("overflows"));
        assert_eq!(parse_payload_kb("64"), Ok(64 * 1024));
    }

    #[test]
    fn test_toggle_spellings() {
        for yes in ["true", "TRUE", "1", "on", "yes"] {
            assert_eq!(parse_toggle(yes), Ok(true), "{yes}");
        }
        for no in ["false", "False", "0", "off", "no"] {
            assert_eq!(parse_toggle(no), Ok(false), "{no}");
        }
        assert!(parse_toggle("").is_err());
    }

    #[test]
    fn test_format_flag_selects_json() {
        let args = parse(&["--format=json"]);
        assert_eq!(args.format, SummaryFormat::Json);
        assert_eq!(parse(&[]).format, SummaryFormat::Text);
    }

    #[test]
    fn test_trace_env_toggle() {
        assert!(env_toggle_enabled("1"));
        assert!(env_toggle_enabled("strain=trace"));
        assert!(!env_toggle_enabled("off"));
        assert!(!env_toggle_enabled("  "));
        assert_eq!(filter_expr_from("true"), None);
        assert_eq!(filter_expr_from("strain::pool=trace"), Some("strain::pool=trace".to_string()));
    }
}
