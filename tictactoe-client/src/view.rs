//! 界面协作者接口
//!
//! 状态机只通过这组调用驱动界面，具体呈现（终端、窗口）由实现方决定。

use protocol::{Cell, GameResult, Symbol};

use crate::game::Scoreboard;

/// 界面协作者
pub trait GameView {
    /// 在格子上绘制符号
    fn render(&mut self, cell: Cell, symbol: Symbol);

    /// 更新回合指示
    fn render_turn_state(&mut self, is_my_turn: bool);

    /// 设置标题提示
    fn set_title_message(&mut self, text: &str);

    /// 显示己方身份
    fn set_identity(&mut self, symbol: Symbol);

    /// 清空棋盘显示
    fn reset_board_view(&mut self);

    /// 启用或禁用棋盘输入
    fn set_input_enabled(&mut self, enabled: bool);

    /// 计分
    ///
    /// `tally` 是已计入 `result` 的累计比分，由状态机持有。
    fn increment_score(&mut self, result: GameResult, tally: &Scoreboard);

    /// 询问是否再来一局
    ///
    /// 返回 `None` 表示稍后通过 [`Intent::PlayAgain`](crate::Intent::PlayAgain) 作答。
    fn prompt_play_again(&mut self, result: GameResult) -> Option<bool>;

    /// 对手离开
    fn notify_opponent_left(&mut self);

    /// 与服务器的连接已断开
    fn notify_disconnected(&mut self);
}
