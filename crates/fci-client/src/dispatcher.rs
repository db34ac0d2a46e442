//! 配置命令分发
//!
//! 在周期会话之外同步执行一次性配置命令：先在本地校验参数，
//! 校验失败时不发送；控制器拒绝时原样返回拒绝原因，不做钳位。

use crate::RobotError;
use crate::session::Session;
use fci_protocol::{ConfigReply, ConfigRequest};

/// 在已持有的会话上执行配置命令
pub(crate) fn execute(
    session: &mut Session<'_>,
    request: &ConfigRequest,
) -> Result<ConfigReply, RobotError> {
    request.validate()?;
    Ok(session.driver().execute(request)?)
}
