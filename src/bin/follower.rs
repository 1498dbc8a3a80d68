//! 实时目标跟随 (Follow Me)
//!
//! 系统架构:
//! 1. 网关: Socket.IO 连接模拟器, 接收 sensor_data
//! 2. 跟随器: 分割推理 → 目标判定 → 世界坐标 → 回发事件 (同一线程)
//! 3. 叠加图: 可选的后台写盘线程
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use follow_me_rs::{
    Args, FcnSegmenter, Follower, FollowerConfig, Model, OverlayWriter, SocketIoClient,
};

/// 断线重连间隔
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    info!("🚀 跟随程序启动");

    let config = FollowerConfig::load(&args.config);
    config.print_summary();

    // ========== 加载模型 ==========
    let model_path = args.model_path();
    info!("📦 分割模型: {}", model_path.display());
    let model = FcnSegmenter::new(&model_path, config.frame_size, args.cuda, args.device_id)?;
    model.summary();

    let mut follower = Follower::new(config.clone(), Box::new(model)).with_profile(args.profile);

    // ========== 叠加图 (可选) ==========
    if let Some(dir) = args.pred_images_dir() {
        let writer = OverlayWriter::spawn(&dir, &config)?;
        follower = follower.with_overlay(writer);
    }

    // ========== 事件循环 (断线重连) ==========
    info!("📡 模拟器地址: {}:{} (EIO={})", args.host, args.port, args.eio);
    loop {
        let mut client = match SocketIoClient::connect(&args.host, args.port, args.eio) {
            Ok(client) => client,
            Err(e) => {
                warn!("⚠️ 连接失败: {}, {}s 后重试", e, RECONNECT_DELAY.as_secs());
                std::thread::sleep(RECONNECT_DELAY);
                continue;
            }
        };

        loop {
            match client.next_event() {
                Ok(Some((name, payload))) => {
                    if let Err(e) = follower.handle_event(&name, payload, &mut client) {
                        error!("❌ {}", e);
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("❌ 连接错误: {}", e);
                    break;
                }
            }
        }

        info!("🔄 reconnect");
        std::thread::sleep(RECONNECT_DELAY);
    }
}
