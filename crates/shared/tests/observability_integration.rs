//! 可观测性与配置模块集成测试

mod metrics_tests {
    use game_shared::observability::metrics::{
        get_handle, record_cache_lookup, record_draw, record_login_bonus, record_operation,
        record_presents_received, record_reward_granted, record_token_consumption,
    };

    #[test]
    fn test_record_operation() {
        record_operation("create_user", "ok", 0.02);
        record_operation("draw", "ok", 0.05);
        record_operation("draw", "conflict", 0.01);
        record_operation("receive_presents", "not_found", 0.01);
    }

    #[test]
    fn test_record_domain_counters() {
        record_cache_lookup("gacha_pool", false);
        record_cache_lookup("gacha_pool", true);
        record_draw(37, 10);
        record_reward_granted("card", 3);
        record_reward_granted("material", 4);
        record_token_consumption("enhance", "invalid");
        record_presents_received("distribution", 2);
        record_login_bonus(false);
    }

    #[test]
    fn test_handle_absent_without_init() {
        // 未安装 recorder 时不会有全局 handle
        assert!(get_handle().is_none());
    }
}

mod config_tests {
    use game_shared::config::{AppConfig, DistributionMode};

    #[test]
    fn test_load_without_files_uses_defaults() {
        // SAFETY: 测试环境中单线程执行，不会有并发问题
        unsafe {
            std::env::set_var("CONFIG_DIR", "/nonexistent-config-dir");
        }
        let config = AppConfig::load("game-core").unwrap();
        unsafe {
            std::env::remove_var("CONFIG_DIR");
        }

        assert_eq!(config.service_name, "game-core");
        assert_eq!(config.game.present_page_size, 100);
        assert_eq!(config.game.initial_card_id, 2);
        assert_eq!(config.game.distribution_mode, DistributionMode::Immediate);
        assert!(config.cluster.peers.is_empty());
    }
}
