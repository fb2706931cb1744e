use std::sync::Arc;

use crate::providers::PresentationSink;

/// 流式总结聚合器
///
/// 单生产者、单消费者：一次summarize调用产出的片段按发射顺序追加到缓冲区，
/// 每追加一次就向展示层推送一次完整快照。缓冲区在一次调用期间只增不减；
/// `finalize`消费自身，关闭流并交出缓冲区 - 即使总结中途失败，
/// 已累积的部分内容也会被保留而不是丢弃。
pub struct StreamAggregator {
    buffer: String,
    sink: Arc<dyn PresentationSink>,
}

impl StreamAggregator {
    pub fn new(sink: Arc<dyn PresentationSink>) -> Self {
        Self {
            buffer: String::new(),
            sink,
        }
    }

    /// 追加一个片段并通知展示层
    pub fn on_fragment(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
        self.sink.on_summary_snapshot(&self.buffer);
    }

    /// 当前缓冲区内容（迄今所有片段的拼接）
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// 关闭流并返回最终文本
    pub fn finalize(self) -> String {
        self.buffer
    }
}
