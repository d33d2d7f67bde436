pub mod stage1_load;
pub mod stage2_metrics;
pub mod stage3_normalize;
pub mod stage4_plots;
pub mod stage5_report;
