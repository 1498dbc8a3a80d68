//! 目标跟踪状态机 (find / lose debounce)
//!
//! 只有两种状态和一个连续丢失计数; 按帧计数去抖, 与帧率无关。

/// 跟踪状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TrackState {
    #[default]
    NotTracking,
    Tracking,
}

/// 单帧更新后的结论
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackUpdate {
    /// 本帧命中, 已处于 (或进入) 跟踪
    Detected,
    /// 跟踪中本帧未命中, 携带当前连续丢失数
    Missed(u32),
    /// 连续丢失超过窗口, 判定目标丢失 (每次丢失只出现一次)
    Lost,
    /// 未跟踪且未命中
    Idle,
}

#[derive(Clone, Debug)]
pub struct TargetTracker {
    state: TrackState,
    consecutive_misses: u32,
    /// 连续丢失帧数 > max_missed 时判定丢失
    max_missed: u32,
}

impl TargetTracker {
    pub fn new(max_missed: u32) -> Self {
        Self {
            state: TrackState::NotTracking,
            consecutive_misses: 0,
            max_missed,
        }
    }

    pub fn update(&mut self, detected: bool) -> TrackUpdate {
        if detected {
            self.state = TrackState::Tracking;
            self.consecutive_misses = 0;
            return TrackUpdate::Detected;
        }

        match self.state {
            TrackState::NotTracking => TrackUpdate::Idle,
            TrackState::Tracking => {
                self.consecutive_misses += 1;
                if self.consecutive_misses > self.max_missed {
                    self.state = TrackState::NotTracking;
                    self.consecutive_misses = 0;
                    TrackUpdate::Lost
                } else {
                    TrackUpdate::Missed(self.consecutive_misses)
                }
            }
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackState::Tracking
    }

    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    /// 本帧若未命中是否会判定丢失 (不修改状态)
    pub fn would_lose(&self) -> bool {
        self.state == TrackState::Tracking && self.consecutive_misses + 1 > self.max_missed
    }
}
